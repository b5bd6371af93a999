pub mod destination;
pub mod http_sink;
pub mod scheduler;
pub mod weeks;

pub use destination::{DataCategory, Destination, DestinationSink, ExportContext, ExportPayload};
pub use http_sink::HttpDestinationSink;
pub use scheduler::{ExportIntent, ExportReport, ExportScheduler, ExportSettings};
pub use weeks::{Stage, WeekSelector};
