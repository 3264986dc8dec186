use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, TimestampSecondBuilder};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use arrow_ipc::writer::FileWriter;

use crate::datamodel::{TIMESTAMP_COLUMN, WideFrame};
use crate::error::Result;

/// Converter for wide frames to Apache Arrow.
pub struct ArrowConverter;

impl ArrowConverter {
    /// A non-null `timestamp` column in seconds, then one nullable Float64
    /// column per frame column.
    pub fn to_record_batch(frame: &WideFrame) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(frame.num_columns() + 1);
        fields.push(Field::new(
            TIMESTAMP_COLUMN,
            DataType::Timestamp(TimeUnit::Second, None),
            false,
        ));
        fields.extend(
            frame
                .columns()
                .iter()
                .map(|name| Field::new(name, DataType::Float64, true)),
        );
        let schema = Arc::new(Schema::new(fields));

        let mut timestamp_builder = TimestampSecondBuilder::with_capacity(frame.num_rows());
        for timestamp in frame.index() {
            timestamp_builder.append_value(timestamp.unix_seconds());
        }
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(frame.num_columns() + 1);
        columns.push(Arc::new(timestamp_builder.finish()));

        for position in 0..frame.num_columns() {
            let mut value_builder = Float64Builder::with_capacity(frame.num_rows());
            for value in frame.column_values(position) {
                value_builder.append_option(value);
            }
            columns.push(Arc::new(value_builder.finish()));
        }

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Arrow IPC file format bytes.
    pub fn to_arrow_file(frame: &WideFrame) -> Result<Vec<u8>> {
        let batch = Self::to_record_batch(frame)?;
        let mut buffer = Vec::new();
        {
            let mut writer = FileWriter::try_new(&mut buffer, &batch.schema())?;
            writer.write(&batch)?;
            writer.finish()?;
        }
        Ok(buffer)
    }
}
