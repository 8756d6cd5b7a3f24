//! Parquet input tables and output chunks
//!
//! Input tables hold one row per event with flat columns `E_i`, `PX_i`,
//! `PY_i`, `PZ_i` for `i` in `0..200` plus the truth columns `truthE`,
//! `truthPX`, `truthPY`, `truthPZ`, `ttv`, `is_signal_new`. Any numeric
//! column type is accepted.
//!
//! Output chunks store per-particle quantities as `List<Float64>`
//! columns, so each row is one event with variable-length arrays.
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Arc,
};

use ahash::AHashMap;
use arrow::{
    array::{
        Array, ArrayRef, AsArray, Float64Array, Float64Builder, Int64Array, ListArray,
        ListBuilder, PrimitiveArray,
    },
    compute::cast,
    datatypes::{DataType, Field, Float64Type, Int64Type, Schema, SchemaRef},
    error::ArrowError,
    record_batch::RecordBatch,
};
use log::debug;
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter};

use crate::{
    error::{SourceError, WriteError},
    event::{Event, RawEvent, Truth, MAX_PARTICLES},
    source::{BatchSink, EventSource},
};

const MOMENTUM_PREFIXES: [&str; 4] = ["E", "PX", "PY", "PZ"];
const TRUTH_COLUMNS: [&str; 6] = [
    "truthE",
    "truthPX",
    "truthPY",
    "truthPZ",
    "ttv",
    "is_signal_new",
];

/// Reads input tables from `{dir}/{name}`
#[derive(Clone, Debug)]
pub struct ParquetSource {
    dir: PathBuf,
}

impl ParquetSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl EventSource for ParquetSource {
    fn read_table(&mut self, name: &str) -> Result<Vec<RawEvent>, SourceError> {
        let path = self.dir.join(name);
        let file = File::open(&path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let columns = InputColumns::resolve(builder.schema(), name)?;
        let nrows = builder.metadata().file_metadata().num_rows();
        debug!("{} has {nrows} rows", path.display());

        let mut rows = Vec::with_capacity(usize::try_from(nrows).unwrap_or_default());
        for batch in builder.build()? {
            columns.read(name, &batch?, &mut rows)?;
        }
        Ok(rows)
    }
}

/// Positions of the input columns in the table schema
struct InputColumns {
    particles: Vec<[usize; 4]>,
    truth: [usize; 6],
}

impl InputColumns {
    fn resolve(schema: &SchemaRef, table: &str) -> Result<Self, SourceError> {
        let index: AHashMap<&str, usize> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(n, field)| (field.name().as_str(), n))
            .collect();
        let lookup = |column: &str| {
            index
                .get(column)
                .copied()
                .ok_or_else(|| SourceError::MissingColumn {
                    table: table.to_owned(),
                    column: column.to_owned(),
                })
        };

        let mut particles = Vec::with_capacity(MAX_PARTICLES);
        for i in 0..MAX_PARTICLES {
            let mut slot = [0; 4];
            for (idx, prefix) in slot.iter_mut().zip(MOMENTUM_PREFIXES) {
                *idx = lookup(&format!("{prefix}_{i}"))?;
            }
            particles.push(slot);
        }
        let mut truth = [0; 6];
        for (idx, column) in truth.iter_mut().zip(TRUTH_COLUMNS) {
            *idx = lookup(column)?;
        }
        Ok(Self { particles, truth })
    }

    fn read(
        &self,
        table: &str,
        batch: &RecordBatch,
        rows: &mut Vec<RawEvent>,
    ) -> Result<(), SourceError> {
        // casts turn unrepresentable values into nulls, so check afterwards
        let checked = |idx: usize, datatype: &DataType| -> Result<ArrayRef, SourceError> {
            let values = cast(batch.column(idx), datatype)?;
            if values.null_count() > 0 {
                return Err(SourceError::NullValues {
                    table: table.to_owned(),
                    column: batch.schema().field(idx).name().clone(),
                });
            }
            Ok(values)
        };
        let float = |idx: usize| -> Result<Float64Array, SourceError> {
            Ok(checked(idx, &DataType::Float64)?
                .as_primitive::<Float64Type>()
                .clone())
        };
        let int = |idx: usize| -> Result<Int64Array, SourceError> {
            Ok(checked(idx, &DataType::Int64)?
                .as_primitive::<Int64Type>()
                .clone())
        };

        let particles = self
            .particles
            .iter()
            .map(|&[e, px, py, pz]| Ok([float(e)?, float(px)?, float(py)?, float(pz)?]))
            .collect::<Result<Vec<_>, SourceError>>()?;
        let [e, px, py, pz, ttv, is_signal_new] = self.truth;
        let [e, px, py, pz] = [float(e)?, float(px)?, float(py)?, float(pz)?];
        let [ttv, is_signal_new] = [int(ttv)?, int(is_signal_new)?];

        for row in 0..batch.num_rows() {
            // padding is not kept
            let slots = particles
                .iter()
                .map(|[e, px, py, pz]| {
                    [e.value(row), px.value(row), py.value(row), pz.value(row)]
                })
                .take_while(|p| p[0] != 0.)
                .collect();
            let truth = Truth {
                e: e.value(row),
                px: px.value(row),
                py: py.value(row),
                pz: pz.value(row),
                ttv: ttv.value(row),
                is_signal_new: is_signal_new.value(row),
            };
            rows.push(RawEvent { slots, truth });
        }
        Ok(())
    }
}

fn to_f64(column: &ArrayRef) -> Result<PrimitiveArray<Float64Type>, ArrowError> {
    Ok(cast(column, &DataType::Float64)?
        .as_primitive::<Float64Type>()
        .clone())
}

fn to_i64(column: &ArrayRef) -> Result<PrimitiveArray<Int64Type>, ArrowError> {
    Ok(cast(column, &DataType::Int64)?
        .as_primitive::<Int64Type>()
        .clone())
}

/// Writes output chunks to `{dir}/{name}.parquet`
#[derive(Clone, Debug)]
pub struct ParquetSink {
    dir: PathBuf,
}

impl ParquetSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the chunk called `name`
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.parquet"))
    }
}

impl BatchSink for ParquetSink {
    fn store(&mut self, name: &str, events: &[Event]) -> Result<(), WriteError> {
        fs::create_dir_all(&self.dir).map_err(|source| WriteError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let batch = to_record_batch(events)?;
        let path = self.path(name);
        let file = File::create(&path).map_err(|source| WriteError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }
}

#[derive(Copy, Clone)]
enum Column {
    Particle(fn(&Event) -> &[f64]),
    Float(fn(&Event) -> f64),
    Int(fn(&Event) -> i64),
}

const OUTPUT_COLUMNS: [(&str, Column); 25] = [
    ("E", Column::Particle(|ev| ev.e.as_slice())),
    ("PX", Column::Particle(|ev| ev.px.as_slice())),
    ("PY", Column::Particle(|ev| ev.py.as_slice())),
    ("PZ", Column::Particle(|ev| ev.pz.as_slice())),
    ("E_log", Column::Particle(|ev| ev.e_log.as_slice())),
    ("P", Column::Particle(|ev| ev.p.as_slice())),
    ("P_log", Column::Particle(|ev| ev.p_log.as_slice())),
    ("Etarel", Column::Particle(|ev| ev.eta_rel.as_slice())),
    ("Phirel", Column::Particle(|ev| ev.phi_rel.as_slice())),
    ("truthE", Column::Float(|ev| ev.truth.e)),
    ("truthPX", Column::Float(|ev| ev.truth.px)),
    ("truthPY", Column::Float(|ev| ev.truth.py)),
    ("truthPZ", Column::Float(|ev| ev.truth.pz)),
    ("ttv", Column::Int(|ev| ev.truth.ttv)),
    ("is_signal_new", Column::Int(|ev| ev.truth.is_signal_new)),
    ("E_tot", Column::Float(|ev| ev.e_tot)),
    ("PX_tot", Column::Float(|ev| ev.px_tot)),
    ("PY_tot", Column::Float(|ev| ev.py_tot)),
    ("PZ_tot", Column::Float(|ev| ev.pz_tot)),
    ("P_tot", Column::Float(|ev| ev.p_tot)),
    ("Eta_tot", Column::Float(|ev| ev.eta_tot)),
    ("Phi_tot", Column::Float(|ev| ev.phi_tot)),
    ("nPart", Column::Int(|ev| ev.n_part as i64)),
    ("origIdx", Column::Int(|ev| ev.orig_idx as i64)),
    ("idx", Column::Int(|ev| ev.idx as i64)),
];

impl Column {
    fn data_type(self) -> DataType {
        match self {
            Column::Particle(_) => {
                DataType::List(Arc::new(Field::new("item", DataType::Float64, true)))
            }
            Column::Float(_) => DataType::Float64,
            Column::Int(_) => DataType::Int64,
        }
    }

    fn build(self, events: &[Event]) -> ArrayRef {
        match self {
            Column::Particle(get) => {
                let nvalues = events.iter().map(|ev| get(ev).len()).sum();
                let mut builder = ListBuilder::with_capacity(
                    Float64Builder::with_capacity(nvalues),
                    events.len(),
                );
                for ev in events {
                    builder.values().append_slice(get(ev));
                    builder.append(true);
                }
                Arc::new(builder.finish())
            }
            Column::Float(get) => {
                Arc::new(Float64Array::from_iter_values(events.iter().map(|ev| get(ev))))
            }
            Column::Int(get) => {
                Arc::new(Int64Array::from_iter_values(events.iter().map(|ev| get(ev))))
            }
        }
    }
}

/// Schema of the output chunks
pub fn output_schema() -> Schema {
    let fields: Vec<_> = OUTPUT_COLUMNS
        .iter()
        .map(|(name, column)| Field::new(*name, column.data_type(), false))
        .collect();
    Schema::new(fields)
}

fn to_record_batch(events: &[Event]) -> Result<RecordBatch, ArrowError> {
    let columns = OUTPUT_COLUMNS
        .iter()
        .map(|(_, column)| column.build(events))
        .collect();
    RecordBatch::try_new(Arc::new(output_schema()), columns)
}

/// Read back an output chunk
pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<Event>, SourceError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_owned(),
        source,
    })?;
    let table = path.display().to_string();
    let mut events = Vec::new();
    for batch in ParquetRecordBatchReaderBuilder::try_new(file)?.build()? {
        let batch = batch?;
        let list = |name| list_column(&batch, &table, name);
        let float = |name| float_column(&batch, &table, name);
        let int = |name| int_column(&batch, &table, name);

        let [e, px, py, pz, e_log, p, p_log, eta_rel, phi_rel] = [
            list("E")?,
            list("PX")?,
            list("PY")?,
            list("PZ")?,
            list("E_log")?,
            list("P")?,
            list("P_log")?,
            list("Etarel")?,
            list("Phirel")?,
        ];
        let [truth_e, truth_px, truth_py, truth_pz] = [
            float("truthE")?,
            float("truthPX")?,
            float("truthPY")?,
            float("truthPZ")?,
        ];
        let [e_tot, px_tot, py_tot, pz_tot, p_tot, eta_tot, phi_tot] = [
            float("E_tot")?,
            float("PX_tot")?,
            float("PY_tot")?,
            float("PZ_tot")?,
            float("P_tot")?,
            float("Eta_tot")?,
            float("Phi_tot")?,
        ];
        let [ttv, is_signal_new, n_part, orig_idx, idx] = [
            int("ttv")?,
            int("is_signal_new")?,
            int("nPart")?,
            int("origIdx")?,
            int("idx")?,
        ];

        for row in 0..batch.num_rows() {
            let values = |list: &ListArray| -> Result<Vec<f64>, SourceError> {
                Ok(to_f64(&list.value(row))?.values().to_vec())
            };
            events.push(Event {
                e: values(e)?,
                px: values(px)?,
                py: values(py)?,
                pz: values(pz)?,
                e_log: values(e_log)?,
                p: values(p)?,
                p_log: values(p_log)?,
                eta_rel: values(eta_rel)?,
                phi_rel: values(phi_rel)?,
                truth: Truth {
                    e: truth_e.value(row),
                    px: truth_px.value(row),
                    py: truth_py.value(row),
                    pz: truth_pz.value(row),
                    ttv: ttv.value(row),
                    is_signal_new: is_signal_new.value(row),
                },
                e_tot: e_tot.value(row),
                px_tot: px_tot.value(row),
                py_tot: py_tot.value(row),
                pz_tot: pz_tot.value(row),
                p_tot: p_tot.value(row),
                eta_tot: eta_tot.value(row),
                phi_tot: phi_tot.value(row),
                n_part: n_part.value(row) as usize,
                orig_idx: orig_idx.value(row) as usize,
                idx: idx.value(row) as usize,
            });
        }
    }
    Ok(events)
}

fn column<'a>(
    batch: &'a RecordBatch,
    table: &str,
    name: &str,
) -> Result<&'a ArrayRef, SourceError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| SourceError::MissingColumn {
            table: table.to_owned(),
            column: name.to_owned(),
        })
}

fn list_column<'a>(
    batch: &'a RecordBatch,
    table: &str,
    name: &str,
) -> Result<&'a ListArray, SourceError> {
    let column = column(batch, table, name)?;
    column
        .as_list_opt::<i32>()
        .ok_or_else(|| SourceError::InvalidColumnType {
            table: table.to_owned(),
            column: name.to_owned(),
            datatype: column.data_type().to_string(),
        })
}

fn float_column(
    batch: &RecordBatch,
    table: &str,
    name: &str,
) -> Result<PrimitiveArray<Float64Type>, SourceError> {
    Ok(to_f64(column(batch, table, name)?)?)
}

fn int_column(
    batch: &RecordBatch,
    table: &str,
    name: &str,
) -> Result<PrimitiveArray<Int64Type>, SourceError> {
    Ok(to_i64(column(batch, table, name)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(n: usize) -> Event {
        let x = n as f64;
        Event {
            e: vec![1. + x, 2.],
            px: vec![0.5, 1.],
            py: vec![0.25, -1.],
            pz: vec![x, 0.],
            e_log: vec![(1. + x).ln(), 2f64.ln()],
            p: vec![1., 2.],
            p_log: vec![0., 2f64.ln()],
            eta_rel: vec![0.1, -0.2],
            phi_rel: vec![0.3, -3.],
            truth: Truth {
                e: 900.,
                px: 1.,
                py: 2.,
                pz: 3.,
                ttv: 0,
                is_signal_new: (n % 2) as i64,
            },
            e_tot: 3. + x,
            px_tot: 1.5,
            py_tot: -0.75,
            pz_tot: x,
            p_tot: 2.,
            eta_tot: 0.4,
            phi_tot: -0.5,
            n_part: 2,
            orig_idx: 10 + n,
            idx: n,
        }
    }

    #[test]
    fn schema_column_names() {
        let schema = output_schema();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names.len(), 25);
        assert_eq!(&names[..4], ["E", "PX", "PY", "PZ"]);
        assert_eq!(&names[22..], ["nPart", "origIdx", "idx"]);
        assert!(matches!(
            schema.field_with_name("Phirel").unwrap().data_type(),
            DataType::List(_)
        ));
        assert_eq!(
            schema.field_with_name("ttv").unwrap().data_type(),
            &DataType::Int64
        );
    }

    #[test]
    fn record_batch_layout() {
        let mut ev = event(0);
        ev.e.clear();
        let batch = to_record_batch(&[event(1), ev, event(2)]).unwrap();
        assert_eq!(batch.num_rows(), 3);
        let e = batch.column_by_name("E").unwrap().as_list::<i32>();
        assert_eq!(e.value_length(0), 2);
        assert_eq!(e.value_length(1), 0);
        assert_eq!(e.value_length(2), 2);
    }

    #[test]
    fn chunk_written_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ParquetSink::new(dir.path().join("out"));
        let events: Vec<_> = (0..4).map(event).collect();
        sink.store("chunk_0", &events).unwrap();
        let path = sink.path("chunk_0");
        assert!(path.ends_with("out/chunk_0.parquet"));
        assert_eq!(read_events(&path).unwrap(), events);
    }

    #[test]
    fn empty_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ParquetSink::new(dir.path());
        sink.store("chunk_0", &[]).unwrap();
        assert!(read_events(sink.path("chunk_0")).unwrap().is_empty());
    }

    #[test]
    fn store_replaces_existing_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ParquetSink::new(dir.path());
        sink.store("c", &[event(0), event(1)]).unwrap();
        sink.store("c", &[event(5)]).unwrap();
        assert_eq!(read_events(sink.path("c")).unwrap(), [event(5)]);
    }

    #[test]
    fn missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ParquetSource::new(dir.path());
        assert!(matches!(
            source.read_table("train.parquet"),
            Err(SourceError::Io { .. })
        ));
    }

    fn input_columns(rows: &[Vec<[f64; 4]>]) -> Vec<(Field, ArrayRef)> {
        let mut columns = Vec::new();
        for i in 0..MAX_PARTICLES {
            for (k, prefix) in MOMENTUM_PREFIXES.into_iter().enumerate() {
                let values = rows.iter().map(|row| row.get(i).map_or(0., |p| p[k]));
                let values: ArrayRef = Arc::new(Float64Array::from_iter_values(values));
                columns.push((Field::new(format!("{prefix}_{i}"), DataType::Float64, true), values));
            }
        }
        for name in TRUTH_COLUMNS {
            let values: ArrayRef = Arc::new(Float64Array::from_iter_values(rows.iter().map(|_| 1.)));
            columns.push((Field::new(name, DataType::Float64, true), values));
        }
        columns
    }

    fn replace_column(columns: &mut [(Field, ArrayRef)], name: &str, values: Float64Array) {
        let column = columns.iter_mut().find(|(f, _)| f.name() == name).unwrap();
        column.1 = Arc::new(values);
    }

    fn write_table(path: &Path, columns: Vec<(Field, ArrayRef)>) {
        let (fields, arrays): (Vec<_>, Vec<_>) = columns.into_iter().unzip();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap();
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn slots_end_before_padding() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            vec![[3., 1., 1., 1.], [2., 1., 0., 1.]],
            vec![[1., 1., 1., 1.]; MAX_PARTICLES],
            vec![],
            vec![[3., 1., 1., 1.], [0., 1., 1., 1.], [4., 1., 1., 1.]],
        ];
        write_table(&dir.path().join("in.parquet"), input_columns(&rows));

        let events = ParquetSource::new(dir.path()).read_table("in.parquet").unwrap();
        let n_part: Vec<_> = events.iter().map(RawEvent::n_part).collect();
        assert_eq!(n_part, [2, MAX_PARTICLES, 0, 1]);
        for ev in &events {
            assert_eq!(ev.slots.len(), ev.n_part());
            assert_eq!(ev.truth.ttv, 1);
        }
        assert_eq!(events[0].slots, rows[0]);
        assert_eq!(events[3].slots, [[3., 1., 1., 1.]]);
    }

    #[test]
    fn null_particle_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut columns = input_columns(&[vec![[1., 1., 1., 1.]], vec![[2., 1., 1., 1.]]]);
        replace_column(&mut columns, "E_0", Float64Array::from(vec![Some(1.), None]));
        write_table(&dir.path().join("in.parquet"), columns);

        let err = ParquetSource::new(dir.path()).read_table("in.parquet").unwrap_err();
        assert!(matches!(
            err,
            SourceError::NullValues { ref table, ref column } if table == "in.parquet" && column == "E_0"
        ));
    }

    #[test]
    fn unconvertible_label_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut columns = input_columns(&[vec![[1., 1., 1., 1.]], vec![[2., 1., 1., 1.]]]);
        replace_column(&mut columns, "ttv", Float64Array::from(vec![1., f64::NAN]));
        write_table(&dir.path().join("in.parquet"), columns);

        let err = ParquetSource::new(dir.path()).read_table("in.parquet").unwrap_err();
        assert!(matches!(
            err,
            SourceError::NullValues { ref column, .. } if column == "ttv"
        ));
    }
}
