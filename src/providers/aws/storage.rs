//! Object-store bucket inventory. Buckets are account-scoped; each entry is
//! annotated with sampled object statistics, multipart-upload leftovers, and
//! lifecycle-policy presence so bucket scenarios need no further calls.

use super::{RegionClients, classify, from_smithy_time};
use crate::models::{Resource, ResourceState, ResourceType};
use crate::providers::ProviderError;
use aws_sdk_s3::error::ProvideErrorMetadata;
use chrono::Utc;

/// Cap on sampled objects per bucket; listing whole petabyte buckets would
/// dominate the scan for no estimation benefit.
const OBJECT_SAMPLE_LIMIT: i32 = 1000;

pub(crate) async fn list_buckets(
    clients: &RegionClients,
    region_label: &str,
) -> Result<Vec<Resource>, ProviderError> {
    let resp = clients
        .s3
        .list_buckets()
        .send()
        .await
        .map_err(|e| classify("s3:ListBuckets", e))?;

    let mut out = Vec::new();
    for bucket in resp.buckets() {
        let Some(name) = bucket.name() else { continue };
        let mut r = Resource::new(ResourceType::Bucket, name, region_label);
        r.name = Some(name.to_string());
        r.state = ResourceState::Available;
        r.created_at = bucket.creation_date().and_then(from_smithy_time);
        match annotate_bucket(clients, name, &mut r).await {
            Ok(()) => out.push(r),
            // A bucket we cannot inspect (cross-region policy, denied) is
            // skipped rather than failing the account-wide enumeration.
            Err(err) if err.is_access_denied() => {
                tracing::warn!(bucket = %name, error = %err, "skipping uninspectable bucket");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(out)
}

async fn annotate_bucket(
    clients: &RegionClients,
    name: &str,
    r: &mut Resource,
) -> Result<(), ProviderError> {
    let now = Utc::now();

    let objects = clients
        .s3
        .list_objects_v2()
        .bucket(name)
        .max_keys(OBJECT_SAMPLE_LIMIT)
        .send()
        .await
        .map_err(|e| classify("s3:ListObjectsV2", e))?;
    let contents = objects.contents();
    let mut total_bytes: i64 = 0;
    let mut newest = None;
    let mut oldest = None;
    for object in contents {
        total_bytes += object.size().unwrap_or(0);
        if let Some(modified) = object.last_modified().and_then(from_smithy_time) {
            newest = Some(newest.map_or(modified, |n: chrono::DateTime<Utc>| n.max(modified)));
            oldest = Some(oldest.map_or(modified, |o: chrono::DateTime<Utc>| o.min(modified)));
        }
    }
    r.attributes.insert(
        "object_count".to_string(),
        objects.key_count().unwrap_or(contents.len() as i32).to_string(),
    );
    r.attributes.insert(
        "sample_truncated".to_string(),
        objects.is_truncated().unwrap_or(false).to_string(),
    );
    r.size_gb = Some(total_bytes as f64 / (1024.0 * 1024.0 * 1024.0));
    if let Some(newest) = newest {
        r.attributes.insert(
            "newest_object_age_days".to_string(),
            (now - newest).num_days().max(0).to_string(),
        );
    }
    if let Some(oldest) = oldest {
        r.attributes.insert(
            "oldest_object_age_days".to_string(),
            (now - oldest).num_days().max(0).to_string(),
        );
    }

    let uploads = clients
        .s3
        .list_multipart_uploads()
        .bucket(name)
        .send()
        .await
        .map_err(|e| classify("s3:ListMultipartUploads", e))?;
    let upload_list = uploads.uploads();
    r.attributes
        .insert("multipart_upload_count".to_string(), upload_list.len().to_string());
    let oldest_upload_age = upload_list
        .iter()
        .filter_map(|u| u.initiated().and_then(from_smithy_time))
        .map(|t| (now - t).num_days().max(0))
        .max();
    if let Some(age) = oldest_upload_age {
        r.attributes.insert("oldest_multipart_age_days".to_string(), age.to_string());
    }

    let has_lifecycle = match clients
        .s3
        .get_bucket_lifecycle_configuration()
        .bucket(name)
        .send()
        .await
    {
        Ok(config) => !config.rules().is_empty(),
        Err(err) if err.code() == Some("NoSuchLifecycleConfiguration") => false,
        Err(err) => return Err(classify("s3:GetBucketLifecycleConfiguration", err)),
    };
    r.attributes.insert("has_lifecycle_policy".to_string(), has_lifecycle.to_string());

    Ok(())
}
