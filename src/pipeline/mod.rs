// Pipeline Module
//
// Pipeline definitions and the extract and load stages around the engine.

pub mod error;
pub mod extract;
pub mod load;
pub mod model;

pub use self::error::{EtlError, EtlResult};
pub use self::extract::{merge_batches, pad_rows, read_csv_header, CsvSource, RowSource, SourceBatch};
pub use self::load::{render_table, ConsoleLoader, Loader, MemoryLoader};
pub use self::model::{
    ColumnSchema, ExtractSource, ExtractStep, LoadStep, Operation, Pipeline, SourceBlock, TransformStep,
};
