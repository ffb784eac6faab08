use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray,
    TimestampMillisecondArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, TimeUnit, TimestampMillisecondType};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::domain::{Dataset, Value, ValueKind};
use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Load one Parquet file into a [`Dataset`], keeping the file's column order.
pub fn read_parquet_file(path: &Path) -> Result<Dataset> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut dataset = Dataset::new(columns);
    for batch in reader {
        let batch = batch?;
        append_batch(&mut dataset, &batch)?;
    }
    Ok(dataset)
}

fn append_batch(dataset: &mut Dataset, batch: &RecordBatch) -> Result<()> {
    let mut columns = batch
        .columns()
        .iter()
        .map(|col| array_to_values(col).map(Vec::into_iter))
        .collect::<Result<Vec<_>>>()?;

    for _ in 0..batch.num_rows() {
        let row = columns
            .iter_mut()
            .map(|col| col.next().unwrap_or(Value::Null))
            .collect();
        dataset.push_row(row)?;
    }
    Ok(())
}

/// Convert an Arrow column into cells. Integer, float, string and temporal families are
/// cast to one canonical width first; anything else is rendered as text.
pub fn array_to_values(array: &ArrayRef) -> Result<Vec<Value>> {
    let values = match array.data_type() {
        DataType::Null => vec![Value::Null; array.len()],
        DataType::Boolean => array
            .as_boolean()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect(),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let ints = cast(array, &DataType::Int64)?;
            ints.as_primitive::<Int64Type>()
                .iter()
                .map(|v| v.map_or(Value::Null, Value::Int))
                .collect()
        }
        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => {
            let floats = cast(array, &DataType::Float64)?;
            floats
                .as_primitive::<Float64Type>()
                .iter()
                .map(Value::from)
                .collect()
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let strings = cast(array, &DataType::Utf8)?;
            strings
                .as_string::<i32>()
                .iter()
                .map(|v| v.map_or(Value::Null, Value::text))
                .collect()
        }
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            let stamps = cast(array, &DataType::Timestamp(TimeUnit::Millisecond, None))?;
            let stamps = stamps.as_primitive::<TimestampMillisecondType>();
            (0..stamps.len())
                .map(|i| {
                    if stamps.is_null(i) {
                        Value::Null
                    } else {
                        stamps.value_as_datetime(i).map_or(Value::Null, Value::Timestamp)
                    }
                })
                .collect()
        }
        _ => (0..array.len())
            .map(|i| {
                if array.is_null(i) {
                    Ok(Value::Null)
                } else {
                    array_value_to_string(array, i).map(Value::Text)
                }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    Ok(values)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Arrow type used to persist a column of the given kind. All-null columns are stored
/// as nullable strings.
pub fn data_type_for(kind: ValueKind) -> DataType {
    match kind {
        ValueKind::Bool => DataType::Boolean,
        ValueKind::Int => DataType::Int64,
        ValueKind::Float => DataType::Float64,
        ValueKind::Timestamp => DataType::Timestamp(TimeUnit::Millisecond, None),
        ValueKind::Null | ValueKind::Text => DataType::Utf8,
    }
}

/// Inferred kind of every column, in column order
pub fn column_kinds(dataset: &Dataset) -> Vec<ValueKind> {
    (0..dataset.columns().len())
        .map(|idx| ValueKind::infer(dataset.rows().iter().map(|row| &row[idx])))
        .collect()
}

/// Build a single record batch holding the whole dataset. Column types are inferred
/// from the values (see [`ValueKind::infer`]).
pub fn dataset_to_batch(dataset: &Dataset) -> Result<RecordBatch> {
    dataset_to_batch_with_kinds(dataset, &column_kinds(dataset))
}

/// Build a record batch using the given column kinds, so several files can share one
/// schema. `kinds` must have one entry per column.
pub fn dataset_to_batch_with_kinds(dataset: &Dataset, kinds: &[ValueKind]) -> Result<RecordBatch> {
    if kinds.len() != dataset.columns().len() {
        return Err(PipelineError::Schema(format!(
            "{} column kinds given for {} columns",
            kinds.len(),
            dataset.columns().len()
        )));
    }

    let mut fields = Vec::with_capacity(kinds.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(kinds.len());
    for (idx, (name, kind)) in dataset.columns().iter().zip(kinds).enumerate() {
        fields.push(Field::new(name, data_type_for(*kind), true));
        arrays.push(build_array(*kind, dataset.rows().iter().map(|row| &row[idx])));
    }

    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(dataset.len()));
    Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
}

fn build_array<'a>(kind: ValueKind, cells: impl Iterator<Item = &'a Value>) -> ArrayRef {
    match kind {
        ValueKind::Bool => Arc::new(BooleanArray::from(
            cells
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ValueKind::Int => Arc::new(Int64Array::from(
            cells.map(|v| v.as_i64()).collect::<Vec<_>>(),
        )),
        ValueKind::Float => Arc::new(Float64Array::from(
            cells.map(|v| v.as_f64()).collect::<Vec<_>>(),
        )),
        ValueKind::Timestamp => Arc::new(TimestampMillisecondArray::from(
            cells
                .map(|v| match v {
                    Value::Timestamp(ts) => Some(ts.and_utc().timestamp_millis()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ValueKind::Null | ValueKind::Text => Arc::new(StringArray::from(
            cells.map(|v| v.to_text()).collect::<Vec<_>>(),
        )),
    }
}

/// Write the dataset to `path` as a Snappy-compressed Parquet file, replacing any
/// existing file. Parent directories are created as needed.
pub fn write_parquet_file(path: &Path, dataset: &Dataset) -> Result<()> {
    write_batch(path, dataset_to_batch(dataset)?)
}

/// Like [`write_parquet_file`], with the column kinds fixed by the caller
pub fn write_parquet_file_with_kinds(path: &Path, dataset: &Dataset, kinds: &[ValueKind]) -> Result<()> {
    write_batch(path, dataset_to_batch_with_kinds(dataset, kinds)?)
}

fn write_batch(path: &Path, batch: RecordBatch) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Render a dataset as an ASCII table
pub fn pretty_format(dataset: &Dataset) -> Result<String> {
    let batch = dataset_to_batch(dataset)?;
    Ok(arrow::util::pretty::pretty_format_batches(&[batch])?.to_string())
}
