use anyhow::Context;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use uuid::Uuid;

use crate::{error::AppError, storage::StorageClient};

const PRESIGN_TTL_SECS: u64 = 30 * 60;
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub struct DecodedImage {
    pub body: Bytes,
    pub content_type: String,
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Parses `data:image/<type>;base64,<payload>`.
pub fn decode_data_url(raw: &str) -> Result<DecodedImage, AppError> {
    let invalid = |why: &str| AppError::validation(format!("Invalid image: {}", why));

    let rest = raw.trim().strip_prefix("data:").ok_or_else(|| invalid("expected a data URL"))?;
    let (meta, payload) = rest.split_once(',').ok_or_else(|| invalid("missing payload"))?;
    let content_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| invalid("payload must be base64"))?
        .to_ascii_lowercase();
    if ext_from_mime(&content_type).is_none() {
        return Err(invalid("unsupported content type"));
    }

    let body = Base64::decode_vec(payload.trim()).map_err(|_| invalid("bad base64"))?;
    if body.is_empty() {
        return Err(invalid("empty payload"));
    }
    if body.len() > MAX_IMAGE_BYTES {
        return Err(invalid("too large"));
    }
    Ok(DecodedImage {
        body: Bytes::from(body),
        content_type,
    })
}

/// Uploads the image and returns its storage key.
pub async fn store_recipe_image(
    storage: &dyn StorageClient,
    author_id: Uuid,
    recipe_id: Uuid,
    image: DecodedImage,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = format!("recipes/{}/{}-{}.{}", author_id, recipe_id, Uuid::new_v4(), ext);
    storage
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Best effort: a leftover object is only logged.
pub async fn discard_image(storage: &dyn StorageClient, key: &str) {
    if let Err(e) = storage.delete_object(key).await {
        tracing::warn!(error = %e, key, "failed to delete recipe image");
    }
}

pub async fn image_url(storage: &dyn StorageClient, key: &str) -> anyhow::Result<String> {
    storage
        .presign_get(key, PRESIGN_TTL_SECS)
        .await
        .with_context(|| format!("presign url for {}", key))
}
