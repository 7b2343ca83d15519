use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Writes an executable shell script standing in for `mysqlbinlog` into `dir`.
///
/// Like `mysqlbinlog --raw`, the script knows the binlog from its last argument and the output
/// prefix from `--result-file`; they are available to `body` as `$binlog` and `$prefix`, along
/// with `$args` holding the whole command line.
pub fn write_fake_exporter(dir: &Path, body: &str) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
args="$*"
for arg in "$@"; do
  case "$arg" in
    --result-file=*) prefix="${{arg#--result-file=}}" ;;
  esac
  binlog="$arg"
done
{body}
"#
    );

    let path = dir.join("fake-mysqlbinlog");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

    path
}

/// Script body writing `content` into the conduit after the password warning.
pub fn streaming_exporter(content: &str) -> String {
    format!(
        r#"echo "mysqlbinlog: [Warning] Using a password on the command line interface can be insecure." >&2
printf '%s' '{content}' > "$prefix$binlog""#
    )
}
