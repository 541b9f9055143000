use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use leptos::logging::{log, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, CanvasRenderingContext2d, File, HtmlCanvasElement, HtmlImageElement, Url};

const OUTPUT_TYPE: &str = "image/jpeg";

/// Encoder qualities tried in order until the output fits the target size.
const QUALITY_STEPS: [f64; 5] = [0.9, 0.8, 0.7, 0.6, 0.5];

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CompressOptions {
    pub max_bytes: u64,
    pub max_dimension: u32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        let config = crate::edit::EditorConfig::default();
        Self {
            max_bytes: config.image_target_bytes,
            max_dimension: config.image_max_dimension,
        }
    }
}

#[derive(Clone, Debug, thiserror::Error)]
pub(crate) enum CompressError {
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("canvas unavailable: {0}")]
    Canvas(String),
    #[error("could not encode image: {0}")]
    Encode(String),
}

#[derive(Clone, Debug)]
pub(crate) struct CompressionResult {
    pub file: Blob,
    pub original_size: u64,
    pub compressed_size: u64,
    /// Percent of the original size saved.
    pub compression_ratio: f64,
}

impl CompressionResult {
    fn unchanged(file: &File) -> Self {
        let size = file.size() as u64;
        Self {
            file: Blob::from(file.clone()),
            original_size: size,
            compressed_size: size,
            compression_ratio: 0.0,
        }
    }
}

/// Scale `(width, height)` down so neither side exceeds `max`, keeping the aspect ratio.
pub(crate) fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if (width <= max && height <= max) || width == 0 || height == 0 {
        return (width, height);
    }
    let scale = f64::from(max) / f64::from(width.max(height));
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

pub(crate) fn compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (1.0 - compressed_size as f64 / original_size as f64) * 100.0
}

pub(crate) fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    let mime = if mime.is_empty() {
        "application/octet-stream"
    } else {
        mime
    };
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub(crate) async fn blob_to_data_url(blob: &Blob) -> Result<String, CompressError> {
    let buf = JsFuture::from(blob.array_buffer())
        .await
        .map_err(|e| CompressError::Encode(js_message(&e)))?;
    let bytes = js_sys::Uint8Array::new(&buf).to_vec();
    Ok(encode_data_url(&blob.type_(), &bytes))
}

/// Re-encode an uploaded image as JPEG within the configured bounds.
///
/// Files already inside both bounds are returned untouched, as is the
/// original whenever re-encoding would not make it smaller.
pub(crate) async fn compress_image(
    file: &File,
    options: CompressOptions,
) -> Result<CompressionResult, CompressError> {
    let original_size = file.size() as u64;

    let url = Url::create_object_url_with_blob(file).map_err(|e| CompressError::Decode(js_message(&e)))?;
    let image = load_image(&url).await;
    let _ = Url::revoke_object_url(&url);
    let image = image?;

    let (width, height) = (image.natural_width(), image.natural_height());
    if original_size <= options.max_bytes && width <= options.max_dimension && height <= options.max_dimension {
        return Ok(CompressionResult::unchanged(file));
    }

    let (target_w, target_h) = fit_within(width, height, options.max_dimension);
    let canvas = draw_scaled(&image, target_w, target_h)?;

    let mut best: Option<Blob> = None;
    for quality in QUALITY_STEPS {
        let blob = canvas_to_blob(&canvas, quality).await?;
        let fits = blob.size() as u64 <= options.max_bytes;
        best = Some(blob);
        if fits {
            break;
        }
    }

    let Some(blob) = best.filter(|b| (b.size() as u64) < original_size) else {
        return Ok(CompressionResult::unchanged(file));
    };
    let compressed_size = blob.size() as u64;
    Ok(CompressionResult {
        file: blob,
        original_size,
        compressed_size,
        compression_ratio: compression_ratio(original_size, compressed_size),
    })
}

/// Compress, falling back to the untouched file on any failure.
pub(crate) async fn compress_or_original(file: &File, options: CompressOptions) -> CompressionResult {
    match compress_image(file, options).await {
        Ok(result) => {
            log!(
                "[image] {} -> {} bytes ({:.0}% smaller)",
                result.original_size,
                result.compressed_size,
                result.compression_ratio
            );
            result
        }
        Err(e) => {
            warn!("[image] compression failed, using original: {e}");
            CompressionResult::unchanged(file)
        }
    }
}

async fn load_image(src: &str) -> Result<HtmlImageElement, CompressError> {
    let image = HtmlImageElement::new().map_err(|e| CompressError::Decode(js_message(&e)))?;
    image.set_src(src);
    JsFuture::from(image.decode())
        .await
        .map_err(|e| CompressError::Decode(js_message(&e)))?;
    Ok(image)
}

fn draw_scaled(image: &HtmlImageElement, width: u32, height: u32) -> Result<HtmlCanvasElement, CompressError> {
    let canvas_err = |e: JsValue| CompressError::Canvas(js_message(&e));
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| CompressError::Canvas("no document".to_string()))?;
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(canvas_err)?
        .dyn_into()
        .map_err(|_| CompressError::Canvas("not a canvas".to_string()))?;
    canvas.set_width(width);
    canvas.set_height(height);

    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")
        .map_err(canvas_err)?
        .ok_or_else(|| CompressError::Canvas("no 2d context".to_string()))?
        .dyn_into()
        .map_err(|_| CompressError::Canvas("unexpected context type".to_string()))?;
    ctx.draw_image_with_html_image_element_and_dw_and_dh(
        image,
        0.0,
        0.0,
        f64::from(width),
        f64::from(height),
    )
    .map_err(canvas_err)?;
    Ok(canvas)
}

async fn canvas_to_blob(canvas: &HtmlCanvasElement, quality: f64) -> Result<Blob, CompressError> {
    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        let cb = Closure::once_into_js(move |blob: JsValue| {
            let _ = resolve.call1(&JsValue::NULL, &blob);
        });
        if let Err(e) =
            canvas.to_blob_with_type_and_encoder_options(cb.unchecked_ref(), OUTPUT_TYPE, &JsValue::from_f64(quality))
        {
            let _ = reject.call1(&JsValue::NULL, &e);
        }
    });

    let value = JsFuture::from(promise)
        .await
        .map_err(|e| CompressError::Encode(js_message(&e)))?;
    value
        .dyn_into::<Blob>()
        .map_err(|_| CompressError::Encode("canvas produced no blob".to_string()))
}

fn js_message(e: &JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_within_keeps_aspect_ratio() {
        assert_eq!(fit_within(3840, 2160, 1920), (1920, 1080));
        assert_eq!(fit_within(1000, 4000, 1920), (480, 1920));
        assert_eq!(fit_within(800, 600, 1920), (800, 600));
        assert_eq!(fit_within(1920, 1920, 1920), (1920, 1920));
        assert_eq!(fit_within(10000, 1, 1920), (1920, 1));
    }

    #[test]
    fn test_compression_ratio_is_percent_saved() {
        assert_eq!(compression_ratio(1000, 250), 75.0);
        assert_eq!(compression_ratio(1000, 1000), 0.0);
        assert_eq!(compression_ratio(0, 10), 0.0);
    }

    #[test]
    fn test_encode_data_url() {
        assert_eq!(encode_data_url("image/jpeg", b"hi"), "data:image/jpeg;base64,aGk=");
        assert_eq!(encode_data_url("", &[]), "data:application/octet-stream;base64,");
    }

    #[test]
    fn test_default_options() {
        let o = CompressOptions::default();
        assert_eq!(o.max_bytes, 1024 * 1024);
        assert_eq!(o.max_dimension, 1920);
    }
}
