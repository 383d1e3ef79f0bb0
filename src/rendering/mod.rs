// Rendering Module
// Turns the enriched report model into PDF, HTML or JSON bytes

pub mod model;
pub mod templates;
pub mod fallback;
pub mod pdf;
pub mod json;
pub mod pipeline;

pub use model::{resolve_branding, EnrichedModel, ProcessedResult, ResolvedBranding};
pub use pdf::{NullRasterizer, RasterError, Rasterizer, TextPdfRasterizer};
pub use pipeline::{estimate_page_count, RenderPipeline, RenderedArtifact};
pub use templates::{DirectoryTemplateEngine, NullTemplateEngine, TemplateEngine, TemplateError};
