pub mod constants;
mod job;
pub mod layout;
pub mod octgn;
mod options;
mod pdf;
pub mod render;
mod stats;
mod tabletop;
mod types;

pub use job::{
    CancelFlag, ExportJob, ExportOutput, ExportProgress, JobMonitor, ProgressFn, export_pdf,
    export_pdf_monitored, run_export, run_job, run_job_with,
};
pub use layout::layout;
pub use octgn::{OctgnOptions, export_octgn, import_octgn, read_octgn};
pub use options::*;
pub use pdf::{DocumentSink, LopdfSink, PdfAssembler, assemble};
pub use render::{ComposedPage, ImageCodec, RasterCodec, compose_deck};
pub use stats::{LayoutStatistics, layout_statistics};
pub use tabletop::{
    TabletopOptions, TabletopSheets, export_tabletop, export_tabletop_monitored, tabletop_grid,
};
pub use types::*;
