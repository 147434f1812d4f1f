//! CHARMM/NAMD DCD trajectories.
//!
//! Little-endian Fortran unformatted records: a header record
//! (`CORD` + 20 control integers), a title record, an atom-count record, and
//! per frame an optional unit-cell record followed by X, Y and Z records of
//! `f32` coordinates.

use super::{Frame, Sampling, TrajectorySink, box_from_cell, cell_parameters};
use crate::error::TrajectoryReadError;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// One AKMA time unit in ps.
const AKMA_TIME: f64 = 0.048_888_21;

/// Byte offset of NSET: record marker (4) + "CORD" (4).
const NSET_OFFSET: u64 = 8;
/// Byte offset of NSTEP, the fourth control integer.
const NSTEP_OFFSET: u64 = NSET_OFFSET + 12;

const CHARMM_VERSION: i32 = 24;

fn write_record<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = i32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "DCD record too large"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.write_all(&len.to_le_bytes())
}

/// Streams frames into a DCD file, keeping the frame count in the header
/// current after every frame.
pub struct DcdWriter<W: Write + Seek> {
    writer: W,
    n_atoms: usize,
    n_frames: i32,
    record_interval: i32,
    has_cell: bool,
}

impl<W: Write + Seek> DcdWriter<W> {
    pub fn new(mut writer: W, n_atoms: usize, sampling: Sampling, has_cell: bool) -> io::Result<Self> {
        if n_atoms == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "number of atoms must be > 0",
            ));
        }
        let natom = i32::try_from(n_atoms)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many atoms for DCD"))?;
        let record_interval = i32::try_from(sampling.record_interval.max(1)).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "record interval too large for DCD")
        })?;

        let mut header = Vec::with_capacity(84);
        header.extend_from_slice(b"CORD");
        let mut icntrl = [0i32; 20];
        icntrl[0] = 0; // NSET
        icntrl[1] = 0; // ISTART
        icntrl[2] = record_interval; // NSAVC
        icntrl[3] = 0; // NSTEP
        icntrl[10] = i32::from(has_cell);
        icntrl[19] = CHARMM_VERSION;
        for (k, value) in icntrl.iter().enumerate() {
            if k == 9 {
                let delta = (sampling.timestep / AKMA_TIME) as f32;
                header.extend_from_slice(&delta.to_le_bytes());
            } else {
                header.extend_from_slice(&value.to_le_bytes());
            }
        }
        write_record(&mut writer, &header)?;

        let mut title = Vec::with_capacity(84);
        title.extend_from_slice(&1i32.to_le_bytes());
        let mut line = b"REMARKS CREATED BY DREID-MD".to_vec();
        line.resize(80, b' ');
        title.extend_from_slice(&line);
        write_record(&mut writer, &title)?;

        write_record(&mut writer, &natom.to_le_bytes())?;

        Ok(Self {
            writer,
            n_atoms,
            n_frames: 0,
            record_interval,
            has_cell,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.n_frames as usize
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn patch_header(&mut self) -> io::Result<()> {
        let end = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(NSET_OFFSET))?;
        self.writer.write_all(&self.n_frames.to_le_bytes())?;
        self.writer.seek(SeekFrom::Start(NSTEP_OFFSET))?;
        let nstep = (self.n_frames - 1).max(0).saturating_mul(self.record_interval);
        self.writer.write_all(&nstep.to_le_bytes())?;
        self.writer.seek(SeekFrom::Start(end))?;
        Ok(())
    }
}

impl<W: Write + Seek> TrajectorySink for DcdWriter<W> {
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        if frame.atom_count() != self.n_atoms {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "frame has {} atoms, trajectory has {}",
                    frame.atom_count(),
                    self.n_atoms
                ),
            ));
        }

        if self.has_cell {
            let [a, b, c, alpha, beta, gamma] = frame
                .box_vectors
                .as_ref()
                .map_or([0.0, 0.0, 0.0, 90.0, 90.0, 90.0], cell_parameters);
            let mut payload = Vec::with_capacity(48);
            for value in [a, gamma, b, beta, alpha, c] {
                payload.extend_from_slice(&value.to_le_bytes());
            }
            write_record(&mut self.writer, &payload)?;
        }

        for axis in 0..3 {
            let mut payload = Vec::with_capacity(4 * self.n_atoms);
            for p in &frame.positions {
                payload.extend_from_slice(&(p[axis] as f32).to_le_bytes());
            }
            write_record(&mut self.writer, &payload)?;
        }

        self.n_frames += 1;
        self.patch_header()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

struct RecordReader<R: Read> {
    reader: R,
    records: usize,
}

impl<R: Read> RecordReader<R> {
    /// Next record, `Ok(None)` on a clean end of file before the record.
    fn next(&mut self) -> Result<Option<Vec<u8>>, RecordError> {
        let mut marker = [0u8; 4];
        match read_full(&mut self.reader, &mut marker)? {
            0 => return Ok(None),
            4 => {}
            _ => return Err(RecordError::Truncated),
        }
        let len = i32::from_le_bytes(marker);
        self.records += 1;
        let len = usize::try_from(len).map_err(|_| RecordError::Invalid("negative record length".into()))?;
        let mut payload = vec![0u8; len];
        if read_full(&mut self.reader, &mut payload)? != len {
            return Err(RecordError::Truncated);
        }
        let mut trailer = [0u8; 4];
        if read_full(&mut self.reader, &mut trailer)? != 4 {
            return Err(RecordError::Truncated);
        }
        if trailer != marker {
            return Err(RecordError::Invalid(
                "record length markers disagree".into(),
            ));
        }
        Ok(Some(payload))
    }
}

enum RecordError {
    Io(io::Error),
    Truncated,
    Invalid(String),
}

impl From<io::Error> for RecordError {
    fn from(e: io::Error) -> Self {
        RecordError::Io(e)
    }
}

/// Reads until `buf` is full or EOF; returns the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn le_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_le_bytes(word)
}

fn le_f32(bytes: &[u8], offset: usize) -> f32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    f32::from_le_bytes(word)
}

fn le_f64(bytes: &[u8], offset: usize) -> f64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[offset..offset + 8]);
    f64::from_le_bytes(word)
}

/// Parsed control block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcdHeader {
    pub n_frames: usize,
    pub start_step: u64,
    pub interval: u64,
    /// ps
    pub timestep: f64,
    pub has_cell: bool,
    pub n_atoms: usize,
}

/// Reads every frame of a DCD stream.
///
/// A frame cut off mid-record, or fewer frames than the header announces,
/// is [`TrajectoryReadError::Truncated`].
pub fn read_frames<R: Read>(reader: R) -> Result<Vec<Frame>, TrajectoryReadError> {
    let mut records = RecordReader { reader, records: 0 };
    let header = read_header(&mut records)?;

    let mut frames = Vec::new();
    loop {
        let index = frames.len();
        let truncated = |e: RecordError, records: usize| match e {
            RecordError::Io(e) => TrajectoryReadError::Io(e),
            RecordError::Truncated => TrajectoryReadError::Truncated { frame: index },
            RecordError::Invalid(detail) => TrajectoryReadError::InvalidRecord {
                record: records,
                detail,
            },
        };

        let first = match records.next() {
            Ok(Some(r)) => r,
            Ok(None) => break,
            Err(e) => return Err(truncated(e, records.records)),
        };

        let box_vectors = if header.has_cell {
            if first.len() != 48 {
                return Err(TrajectoryReadError::InvalidRecord {
                    record: records.records,
                    detail: format!("unit cell record has {} bytes", first.len()),
                });
            }
            Some(read_cell(&first))
        } else {
            None
        };

        let mut axes = Vec::with_capacity(3);
        if !header.has_cell {
            axes.push(first);
        }
        while axes.len() < 3 {
            match records.next() {
                Ok(Some(r)) => axes.push(r),
                Ok(None) => return Err(TrajectoryReadError::Truncated { frame: index }),
                Err(e) => return Err(truncated(e, records.records)),
            }
        }

        for axis in &axes {
            if axis.len() != 4 * header.n_atoms {
                return Err(TrajectoryReadError::AtomCountMismatch {
                    frame: index,
                    expected: header.n_atoms,
                    found: axis.len() / 4,
                });
            }
        }

        let positions = (0..header.n_atoms)
            .map(|i| {
                [
                    le_f32(&axes[0], 4 * i) as f64,
                    le_f32(&axes[1], 4 * i) as f64,
                    le_f32(&axes[2], 4 * i) as f64,
                ]
            })
            .collect();
        let step = header.start_step + index as u64 * header.interval;
        frames.push(Frame {
            index,
            step,
            time: step as f64 * header.timestep,
            positions,
            potential_energy: None,
            temperature: None,
            box_vectors,
        });
    }

    if header.n_frames > frames.len() {
        return Err(TrajectoryReadError::Truncated {
            frame: frames.len(),
        });
    }
    if frames.is_empty() {
        return Err(TrajectoryReadError::Empty);
    }
    Ok(frames)
}

fn read_header<R: Read>(records: &mut RecordReader<R>) -> Result<DcdHeader, TrajectoryReadError> {
    let mut next = |what: &str| -> Result<Vec<u8>, TrajectoryReadError> {
        match records.next() {
            Ok(Some(r)) => Ok(r),
            Ok(None) if what == "header" => Err(TrajectoryReadError::Empty),
            Ok(None) | Err(RecordError::Truncated) => Err(TrajectoryReadError::InvalidRecord {
                record: records.records,
                detail: format!("file ends inside the {what} record"),
            }),
            Err(RecordError::Io(e)) => Err(TrajectoryReadError::Io(e)),
            Err(RecordError::Invalid(detail)) => Err(TrajectoryReadError::InvalidRecord {
                record: records.records,
                detail,
            }),
        }
    };

    let control = next("header")?;
    if control.len() != 84 || &control[..4] != b"CORD" {
        return Err(TrajectoryReadError::InvalidRecord {
            record: 1,
            detail: "not a DCD coordinate file".into(),
        });
    }
    let icntrl = |k: usize| le_i32(&control, 4 + 4 * k);
    let _title = next("title")?;
    let atoms = next("atom count")?;
    if atoms.len() != 4 {
        return Err(TrajectoryReadError::InvalidRecord {
            record: 3,
            detail: "atom count record must hold one integer".into(),
        });
    }

    let n_atoms = le_i32(&atoms, 0);
    Ok(DcdHeader {
        n_frames: icntrl(0).max(0) as usize,
        start_step: icntrl(1).max(0) as u64,
        interval: icntrl(2).max(1) as u64,
        timestep: le_f32(&control, 4 + 4 * 9) as f64 * AKMA_TIME,
        has_cell: icntrl(10) != 0,
        n_atoms: n_atoms.max(0) as usize,
    })
}

/// Unit cell record `[a, gamma, b, beta, alpha, c]`; angles may be stored
/// as cosines by some writers.
fn read_cell(record: &[u8]) -> [[f64; 3]; 3] {
    let raw: Vec<f64> = (0..6).map(|k| le_f64(record, 8 * k)).collect();
    let angle = |v: f64| {
        if v.abs() <= 1.0 {
            v.acos().to_degrees()
        } else {
            v
        }
    };
    box_from_cell([raw[0], raw[2], raw[5], angle(raw[4]), angle(raw[3]), angle(raw[1])])
}
