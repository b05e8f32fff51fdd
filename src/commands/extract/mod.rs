mod debug_sink;
mod error;
mod export;
mod metadata;
mod normalize;
mod ocr_select;
mod pipeline;
mod rasterize;
mod record;
mod run;
mod segment;
mod tesseract;
#[cfg(test)]
mod tests;

pub use run::run;

pub(crate) use export::{
    SqliteWorkbookExporter, TabularExporter, record_statistics, validate_workbook_path,
};
pub(crate) use pipeline::{PipelineState, RecordPipeline};
