use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;
use pitr_config::shared::StorageConfig;
use secrecy::ExposeSecret;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, PitrError, PitrResult};
use crate::pitr_error;
use crate::store::blob::{BlobReader, BlobStore};

/// [`BlobStore`] backed by an S3 compatible object storage.
///
/// Payloads are streamed with multipart uploads so that at most one part is held in memory at a
/// time. A multipart upload only becomes visible once completed and is aborted on any failure,
/// hence a failed upload never leaves a truncated object behind.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    prefix: String,
    part_size: usize,
}

impl S3BlobStore {
    /// Creates a new store from the storage configuration, using static credentials.
    pub async fn new(config: &StorageConfig) -> PitrResult<S3BlobStore> {
        let credentials = aws_sdk_s3::config::Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.expose_secret().clone(),
            None,
            None,
            "static",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(S3BlobStore::from_client(
            Client::from_conf(builder.build()),
            config.bucket.clone(),
            &config.prefix,
            config.part_size_bytes,
        ))
    }

    /// Creates a new store on top of an already configured client.
    pub fn from_client(
        client: Client,
        bucket: impl Into<String>,
        prefix: &str,
        part_size: usize,
    ) -> S3BlobStore {
        S3BlobStore {
            client,
            bucket: bucket.into(),
            prefix: prefix.trim_end_matches('/').to_owned(),
            part_size,
        }
    }

    /// Checks that the bucket exists and is reachable with the configured credentials.
    pub async fn check_connection(&self) -> PitrResult<()> {
        info!(bucket = %self.bucket, "checking connection to object storage");

        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|err| {
                pitr_error!(
                    ErrorKind::StorageConnectionFailed,
                    "Failed to reach bucket",
                    format!("{}: {}", self.bucket, DisplayErrorContext(&err))
                )
            })?;

        Ok(())
    }

    fn object_key(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_owned()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }

    async fn put_single(&self, key: &str, part: Bytes) -> PitrResult<u64> {
        let size = part.len() as u64;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(part))
            .send()
            .await
            .map_err(|err| {
                pitr_error!(
                    ErrorKind::StorageWriteFailed,
                    "Failed to put object",
                    format!("{key}: {}", DisplayErrorContext(&err))
                )
            })?;

        Ok(size)
    }

    async fn put_multipart<R>(&self, key: &str, first_part: Bytes, reader: &mut R) -> PitrResult<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let upload = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                pitr_error!(
                    ErrorKind::StorageWriteFailed,
                    "Failed to create multipart upload",
                    format!("{key}: {}", DisplayErrorContext(&err))
                )
            })?;

        let Some(upload_id) = upload.upload_id() else {
            return Err(pitr_error!(
                ErrorKind::StorageWriteFailed,
                "Multipart upload has no id",
                key
            ));
        };

        match self.upload_parts(key, upload_id, first_part, reader).await {
            Ok(size) => Ok(size),
            Err(err) => {
                // The upload must be aborted, otherwise the parts linger in the bucket.
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(upload_id)
                    .send()
                    .await
                {
                    warn!(
                        key,
                        error = %DisplayErrorContext(&abort_err),
                        "failed to abort multipart upload"
                    );

                    return Err(PitrError::many(vec![
                        err,
                        pitr_error!(
                            ErrorKind::StorageWriteFailed,
                            "Failed to abort multipart upload",
                            format!("{key}: {}", DisplayErrorContext(&abort_err))
                        ),
                    ]));
                }

                Err(err)
            }
        }
    }

    async fn upload_parts<R>(
        &self,
        key: &str,
        upload_id: &str,
        first_part: Bytes,
        reader: &mut R,
    ) -> PitrResult<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut completed_parts = Vec::new();
        let mut part = first_part;
        let mut part_number: i32 = 1;
        let mut size = 0u64;

        loop {
            let part_len = part.len();
            size += part_len as u64;

            let output = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(part))
                .send()
                .await
                .map_err(|err| {
                    pitr_error!(
                        ErrorKind::StorageWriteFailed,
                        "Failed to upload part",
                        format!("{key} part {part_number}: {}", DisplayErrorContext(&err))
                    )
                })?;

            debug!(key, part_number, part_len, "uploaded part");

            completed_parts.push(
                CompletedPart::builder()
                    .set_e_tag(output.e_tag().map(str::to_owned))
                    .part_number(part_number)
                    .build(),
            );

            if part_len < self.part_size {
                break;
            }

            part = read_part(reader, self.part_size).await?;
            if part.is_empty() {
                break;
            }
            part_number += 1;
        }

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|err| {
                pitr_error!(
                    ErrorKind::StorageWriteFailed,
                    "Failed to complete multipart upload",
                    format!("{key}: {}", DisplayErrorContext(&err))
                )
            })?;

        Ok(size)
    }
}

impl BlobStore for S3BlobStore {
    async fn get_object(&self, name: &str) -> PitrResult<BlobReader> {
        let key = self.object_key(name);

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|err| {
                if matches!(err.as_service_error(), Some(GetObjectError::NoSuchKey(_))) {
                    return pitr_error!(ErrorKind::ObjectNotFound, "Object does not exist", key);
                }

                pitr_error!(
                    ErrorKind::StorageReadFailed,
                    "Failed to get object",
                    format!("{key}: {}", DisplayErrorContext(&err))
                )
            })?;

        Ok(Box::new(output.body.into_async_read()))
    }

    async fn put_object<R>(&self, name: &str, mut reader: R) -> PitrResult<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let key = self.object_key(name);

        let first_part = read_part(&mut reader, self.part_size).await?;
        let size = if first_part.len() < self.part_size {
            self.put_single(&key, first_part).await?
        } else {
            self.put_multipart(&key, first_part, &mut reader).await?
        };

        debug!(bucket = %self.bucket, key, size, "stored object");

        Ok(size)
    }
}

/// Reads up to `part_size` bytes, stopping early only at end of stream.
async fn read_part<R>(reader: &mut R, part_size: usize) -> PitrResult<Bytes>
where
    R: AsyncRead + Unpin + Send,
{
    let mut buffer = vec![0; part_size];
    let mut filled = 0;

    while filled < part_size {
        let read = reader
            .read(&mut buffer[filled..])
            .await
            .map_err(PitrError::from)?;
        if read == 0 {
            break;
        }
        filled += read;
    }

    buffer.truncate(filled);

    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::operation::abort_multipart_upload::{
        AbortMultipartUploadError, AbortMultipartUploadOutput,
    };
    use aws_sdk_s3::operation::complete_multipart_upload::CompleteMultipartUploadOutput;
    use aws_sdk_s3::operation::create_multipart_upload::CreateMultipartUploadOutput;
    use aws_sdk_s3::operation::get_object::GetObjectOutput;
    use aws_sdk_s3::operation::put_object::PutObjectOutput;
    use aws_sdk_s3::operation::upload_part::UploadPartOutput;
    use aws_sdk_s3::types::error::{NoSuchKey, NoSuchUpload};
    use aws_smithy_mocks::{RuleMode, mock, mock_client};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    const BUCKET: &str = "binlogs";
    const PART_SIZE: usize = 8;

    /// Reader serving `data`, then failing like an aborted extraction.
    struct FailingReader {
        data: &'static [u8],
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.data.is_empty() {
                let err = pitr_error!(ErrorKind::ExtractionFailed, "mysqlbinlog exited with an error");
                return Poll::Ready(Err(err.into()));
            }

            let len = self.data.len().min(buf.remaining());
            buf.put_slice(&self.data[..len]);
            self.data = &self.data[len..];

            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let get_object = mock!(Client::get_object)
            .match_requests(|req| {
                req.bucket() == Some(BUCKET) && req.key() == Some("cluster1/last-binlog-set")
            })
            .then_error(|| GetObjectError::NoSuchKey(NoSuchKey::builder().build()));
        let client = mock_client!(aws_sdk_s3, [&get_object]);
        let store = S3BlobStore::from_client(client, BUCKET, "cluster1/", PART_SIZE);

        let err = store.get_object("last-binlog-set").await.err().unwrap();

        assert_eq!(err.kind(), ErrorKind::ObjectNotFound);
        assert_eq!(get_object.num_calls(), 1);
    }

    #[tokio::test]
    async fn existing_object_is_read() {
        let get_object = mock!(Client::get_object)
            .match_requests(|req| req.key() == Some("last-binlog-set"))
            .then_output(|| {
                GetObjectOutput::builder()
                    .body(ByteStream::from_static(b"uuid:1-10"))
                    .build()
            });
        let client = mock_client!(aws_sdk_s3, [&get_object]);
        let store = S3BlobStore::from_client(client, BUCKET, "", PART_SIZE);

        let mut reader = store.get_object("last-binlog-set").await.unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).await.unwrap();

        assert_eq!(content, "uuid:1-10");
    }

    #[tokio::test]
    async fn short_payload_is_put_in_one_request() {
        let put_object = mock!(Client::put_object)
            .match_requests(|req| req.key() == Some("mysql-bin.000001"))
            .then_output(|| PutObjectOutput::builder().build());
        let create_upload = mock!(Client::create_multipart_upload)
            .then_output(|| CreateMultipartUploadOutput::builder().upload_id("upload-1").build());
        let client = mock_client!(
            aws_sdk_s3,
            RuleMode::MatchAny,
            [&put_object, &create_upload]
        );
        let store = S3BlobStore::from_client(client, BUCKET, "", PART_SIZE);

        let size = store
            .put_object("mysql-bin.000001", &b"binlog"[..])
            .await
            .unwrap();

        assert_eq!(size, 6);
        assert_eq!(put_object.num_calls(), 1);
        assert_eq!(create_upload.num_calls(), 0);
    }

    #[tokio::test]
    async fn long_payload_is_uploaded_in_parts() {
        let create_upload = mock!(Client::create_multipart_upload)
            .then_output(|| CreateMultipartUploadOutput::builder().upload_id("upload-1").build());
        let first_part = mock!(Client::upload_part)
            .match_requests(|req| req.part_number() == Some(1))
            .then_output(|| UploadPartOutput::builder().e_tag("etag-1").build());
        let second_part = mock!(Client::upload_part)
            .match_requests(|req| req.part_number() == Some(2))
            .then_output(|| UploadPartOutput::builder().e_tag("etag-2").build());
        let complete_upload = mock!(Client::complete_multipart_upload)
            .match_requests(|req| {
                req.upload_id() == Some("upload-1")
                    && req.multipart_upload().map(|upload| upload.parts().len()) == Some(2)
            })
            .then_output(|| CompleteMultipartUploadOutput::builder().build());
        let client = mock_client!(
            aws_sdk_s3,
            RuleMode::MatchAny,
            [&create_upload, &first_part, &second_part, &complete_upload]
        );
        let store = S3BlobStore::from_client(client, BUCKET, "", PART_SIZE);

        let size = store
            .put_object("mysql-bin.000001", &b"0123456789ab"[..])
            .await
            .unwrap();

        assert_eq!(size, 12);
        assert_eq!(first_part.num_calls(), 1);
        assert_eq!(second_part.num_calls(), 1);
        assert_eq!(complete_upload.num_calls(), 1);
    }

    #[tokio::test]
    async fn failed_payload_aborts_multipart_upload() {
        let create_upload = mock!(Client::create_multipart_upload)
            .then_output(|| CreateMultipartUploadOutput::builder().upload_id("upload-1").build());
        let upload_part = mock!(Client::upload_part)
            .then_output(|| UploadPartOutput::builder().e_tag("etag-1").build());
        let abort_upload = mock!(Client::abort_multipart_upload)
            .match_requests(|req| req.upload_id() == Some("upload-1"))
            .then_output(|| AbortMultipartUploadOutput::builder().build());
        let complete_upload = mock!(Client::complete_multipart_upload)
            .then_output(|| CompleteMultipartUploadOutput::builder().build());
        let client = mock_client!(
            aws_sdk_s3,
            RuleMode::MatchAny,
            [&create_upload, &upload_part, &abort_upload, &complete_upload]
        );
        let store = S3BlobStore::from_client(client, BUCKET, "", PART_SIZE);

        let reader = FailingReader { data: b"01234567" };
        let err = store.put_object("mysql-bin.000001", reader).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExtractionFailed);
        assert_eq!(upload_part.num_calls(), 1);
        assert_eq!(abort_upload.num_calls(), 1);
        assert_eq!(complete_upload.num_calls(), 0);
    }

    #[tokio::test]
    async fn failed_abort_is_reported_with_upload_failure() {
        let create_upload = mock!(Client::create_multipart_upload)
            .then_output(|| CreateMultipartUploadOutput::builder().upload_id("upload-1").build());
        let upload_part = mock!(Client::upload_part)
            .then_output(|| UploadPartOutput::builder().e_tag("etag-1").build());
        let abort_upload = mock!(Client::abort_multipart_upload).then_error(|| {
            AbortMultipartUploadError::NoSuchUpload(NoSuchUpload::builder().build())
        });
        let client = mock_client!(
            aws_sdk_s3,
            RuleMode::MatchAny,
            [&create_upload, &upload_part, &abort_upload]
        );
        let store = S3BlobStore::from_client(client, BUCKET, "", PART_SIZE);

        let reader = FailingReader { data: b"01234567" };
        let err = store.put_object("mysql-bin.000001", reader).await.unwrap_err();

        assert_eq!(
            err.kinds(),
            vec![ErrorKind::ExtractionFailed, ErrorKind::StorageWriteFailed]
        );
        assert!(format!("{err}").contains("Failed to abort multipart upload"));
    }

    #[tokio::test]
    async fn read_part_fills_up_to_part_size() {
        let data = vec![7u8; 25];
        let mut reader = &data[..];

        let first = read_part(&mut reader, 10).await.unwrap();
        let second = read_part(&mut reader, 10).await.unwrap();
        let third = read_part(&mut reader, 10).await.unwrap();
        let fourth = read_part(&mut reader, 10).await.unwrap();

        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 10);
        assert_eq!(third.len(), 5);
        assert!(fourth.is_empty());
    }
}
