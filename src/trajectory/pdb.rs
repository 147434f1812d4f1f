//! Multi-model PDB trajectories.
//!
//! ```text
//! REMARK 250 FRAME 0 STEP 0 TIME 0.0000 EPOT -1234.5678 TEMP 0.00
//! MODEL        1
//! ATOM      1  N   ALA A   1      11.104   6.134  -6.504  1.00  0.00           N
//! ...
//! ENDMDL
//! ```

use super::{Frame, TrajectorySink, box_from_cell, cell_parameters, check_atom_counts};
use crate::error::TrajectoryReadError;
use crate::model::metadata::ResidueCategory;
use crate::model::structure::Structure;
use crate::model::types::Element;
use std::io::{self, BufRead, Write};

/// Identity columns of one `ATOM`/`HETATM` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbAtom {
    pub name: String,
    pub residue_name: String,
    pub chain_id: char,
    pub residue_id: i32,
    pub insertion_code: char,
    pub element: Option<Element>,
    pub hetero: bool,
}

impl PdbAtom {
    /// Labels for every atom of `structure`, falling back to element-derived
    /// names when residue metadata is absent.
    pub fn from_structure(structure: &Structure) -> Vec<Self> {
        let info = &structure.metadata.atom_info;
        if info.len() != structure.atom_count() {
            return structure
                .atoms
                .iter()
                .map(|atom| PdbAtom {
                    name: atom.element.symbol().to_ascii_uppercase(),
                    residue_name: "UNK".to_string(),
                    chain_id: 'A',
                    residue_id: 1,
                    insertion_code: ' ',
                    element: Some(atom.element),
                    hetero: true,
                })
                .collect();
        }
        structure
            .atoms
            .iter()
            .zip(info)
            .map(|(atom, info)| PdbAtom {
                name: info.atom_name.clone(),
                residue_name: info.residue_name.clone(),
                chain_id: info.chain_id,
                residue_id: info.residue_id,
                insertion_code: info.insertion_code,
                element: Some(atom.element),
                hetero: info.category != ResidueCategory::Standard,
            })
            .collect()
    }
}

/// Coordinates a `%8.3f` field can hold.
const COORDINATE_RANGE: std::ops::RangeInclusive<f64> = -999.999..=9999.999;

/// Formats a fixed-width `ATOM`/`HETATM` line (without newline).
pub fn format_atom_line(serial: usize, atom: &PdbAtom, position: [f64; 3]) -> String {
    let record = if atom.hetero { "HETATM" } else { "ATOM  " };
    let name = if atom.name.len() < 4 {
        format!(" {:<3}", atom.name)
    } else {
        atom.name.chars().take(4).collect()
    };
    let residue: String = atom.residue_name.chars().take(3).collect();
    let element = atom
        .element
        .map(|e| e.symbol().to_ascii_uppercase())
        .unwrap_or_default();
    format!(
        "{record}{serial:>5} {name:<4} {residue:>3} {chain}{resid:>4}{icode}   {x:>8.3}{y:>8.3}{z:>8.3}{occ:>6.2}{b:>6.2}          {element:>2}",
        serial = serial % 100_000,
        chain = atom.chain_id,
        resid = atom.residue_id.rem_euclid(10_000),
        icode = atom.insertion_code,
        x = position[0],
        y = position[1],
        z = position[2],
        occ = 1.0,
        b = 0.0,
    )
}

fn format_cryst1(v: &[[f64; 3]; 3]) -> String {
    let [a, b, c, alpha, beta, gamma] = cell_parameters(v);
    format!("CRYST1{a:>9.3}{b:>9.3}{c:>9.3}{alpha:>7.2}{beta:>7.2}{gamma:>7.2} P 1           1")
}

fn format_remark(frame: &Frame) -> String {
    let mut line = format!(
        "REMARK 250 FRAME {} STEP {} TIME {:.4}",
        frame.index, frame.step, frame.time
    );
    if let Some(e) = frame.potential_energy {
        line.push_str(&format!(" EPOT {e:.4}"));
    }
    if let Some(t) = frame.temperature {
        line.push_str(&format!(" TEMP {t:.2}"));
    }
    line
}

/// Streams frames as PDB models.
pub struct PdbTrajectoryWriter<W: Write> {
    writer: W,
    atoms: Vec<PdbAtom>,
    frames: usize,
    finished: bool,
}

impl<W: Write> PdbTrajectoryWriter<W> {
    pub fn new(
        mut writer: W,
        atoms: Vec<PdbAtom>,
        box_vectors: Option<[[f64; 3]; 3]>,
    ) -> io::Result<Self> {
        writeln!(writer, "REMARK   1 TRAJECTORY WRITTEN BY DREID-MD")?;
        if let Some(v) = &box_vectors {
            writeln!(writer, "{}", format_cryst1(v))?;
        }
        Ok(Self {
            writer,
            atoms,
            frames: 0,
            finished: false,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TrajectorySink for PdbTrajectoryWriter<W> {
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        if self.finished {
            return Err(io::Error::other("trajectory already finished"));
        }
        if frame.atom_count() != self.atoms.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "frame has {} atoms, trajectory has {}",
                    frame.atom_count(),
                    self.atoms.len()
                ),
            ));
        }
        if let Some(atom) = frame
            .positions
            .iter()
            .position(|p| p.iter().any(|c| !COORDINATE_RANGE.contains(c)))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "atom {} at {:?} does not fit the PDB coordinate columns",
                    atom + 1,
                    frame.positions[atom]
                ),
            ));
        }
        writeln!(self.writer, "{}", format_remark(frame))?;
        writeln!(self.writer, "MODEL     {:>4}", self.frames + 1)?;
        for (i, (atom, pos)) in self.atoms.iter().zip(&frame.positions).enumerate() {
            writeln!(self.writer, "{}", format_atom_line(i + 1, atom, *pos))?;
        }
        writeln!(self.writer, "ENDMDL")?;
        self.frames += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        if !self.finished {
            writeln!(self.writer, "END")?;
            self.finished = true;
        }
        self.writer.flush()
    }
}

/// Columns `start..end` of `line`, empty when the line is shorter.
fn columns(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("")
}

fn record_name(line: &str) -> &str {
    columns(line, 0, 6).trim_end()
}

fn parse_coordinate(line: &str, start: usize, line_no: usize) -> Result<f64, TrajectoryReadError> {
    let field = columns(line, start, start + 8).trim();
    field.parse::<f64>().map_err(|_| {
        TrajectoryReadError::malformed(line_no, format!("invalid coordinate '{field}'"))
    })
}

fn parse_position(line: &str, line_no: usize) -> Result<[f64; 3], TrajectoryReadError> {
    Ok([
        parse_coordinate(line, 30, line_no)?,
        parse_coordinate(line, 38, line_no)?,
        parse_coordinate(line, 46, line_no)?,
    ])
}

fn parse_cryst1(line: &str, line_no: usize) -> Result<[[f64; 3]; 3], TrajectoryReadError> {
    let spans = [(6, 15), (15, 24), (24, 33), (33, 40), (40, 47), (47, 54)];
    let mut cell = [0.0; 6];
    for (value, (start, end)) in cell.iter_mut().zip(spans) {
        let field = columns(line, start, end).trim();
        *value = field.parse().map_err(|_| {
            TrajectoryReadError::malformed(line_no, format!("invalid CRYST1 field '{field}'"))
        })?;
    }
    Ok(box_from_cell(cell))
}

/// Key/value annotations of a `REMARK 250` frame line.
#[derive(Debug, Default)]
struct FrameRemark {
    index: Option<usize>,
    step: Option<u64>,
    time: Option<f64>,
    potential_energy: Option<f64>,
    temperature: Option<f64>,
}

fn parse_remark(line: &str) -> Option<FrameRemark> {
    let rest = line.strip_prefix("REMARK 250")?.trim();
    if !rest.starts_with("FRAME") {
        return None;
    }
    let mut remark = FrameRemark::default();
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    for pair in tokens.chunks(2) {
        let [key, value] = pair else { break };
        match *key {
            "FRAME" => remark.index = value.parse().ok(),
            "STEP" => remark.step = value.parse().ok(),
            "TIME" => remark.time = value.parse().ok(),
            "EPOT" => remark.potential_energy = value.parse().ok(),
            "TEMP" => remark.temperature = value.parse().ok(),
            _ => {}
        }
    }
    Some(remark)
}

struct OpenModel {
    explicit: bool,
    remark: FrameRemark,
    positions: Vec<[f64; 3]>,
}

impl OpenModel {
    fn close(self, index: usize, box_vectors: Option<[[f64; 3]; 3]>) -> Frame {
        let index = self.remark.index.unwrap_or(index);
        Frame {
            index,
            step: self.remark.step.unwrap_or(index as u64),
            time: self.remark.time.unwrap_or(0.0),
            positions: self.positions,
            potential_energy: self.remark.potential_energy,
            temperature: self.remark.temperature,
            box_vectors,
        }
    }
}

/// Reads every model of a PDB trajectory.
///
/// A file without `MODEL` records is a single-frame trajectory. A model left
/// open at end of file, or a cut-off coordinate line at the very end, is
/// reported as [`TrajectoryReadError::Truncated`].
pub fn read_frames<R: BufRead>(reader: R) -> Result<Vec<Frame>, TrajectoryReadError> {
    let mut frames: Vec<Frame> = Vec::new();
    let mut open: Option<OpenModel> = None;
    let mut remark: Option<FrameRemark> = None;
    let mut cell = None;
    let mut lines = reader.lines().enumerate().peekable();

    while let Some((i, line)) = lines.next() {
        let line = line?;
        let line_no = i + 1;
        match record_name(&line) {
            "CRYST1" => cell = Some(parse_cryst1(&line, line_no)?),
            "REMARK" => {
                if let Some(r) = parse_remark(&line) {
                    remark = Some(r);
                }
            }
            "MODEL" => {
                if open.as_ref().is_some_and(|m| m.explicit) {
                    return Err(TrajectoryReadError::malformed(
                        line_no,
                        "MODEL inside an unterminated model",
                    ));
                }
                open = Some(OpenModel {
                    explicit: true,
                    remark: remark.take().unwrap_or_default(),
                    positions: Vec::new(),
                });
            }
            "ATOM" | "HETATM" => {
                let position = match parse_position(&line, line_no) {
                    Ok(p) => p,
                    Err(_) if lines.peek().is_none() => {
                        return Err(TrajectoryReadError::Truncated {
                            frame: frames.len(),
                        });
                    }
                    Err(e) => return Err(e),
                };
                open.get_or_insert_with(|| OpenModel {
                    explicit: false,
                    remark: remark.take().unwrap_or_default(),
                    positions: Vec::new(),
                })
                .positions
                .push(position);
            }
            "ENDMDL" => {
                let model = open.take().ok_or_else(|| {
                    TrajectoryReadError::malformed(line_no, "ENDMDL without MODEL")
                })?;
                frames.push(model.close(frames.len(), cell));
            }
            "END" => {
                if let Some(model) = open.take() {
                    if model.explicit {
                        return Err(TrajectoryReadError::Truncated {
                            frame: frames.len(),
                        });
                    }
                    frames.push(model.close(frames.len(), cell));
                }
                break;
            }
            _ => {}
        }
    }

    if let Some(model) = open.take() {
        if model.explicit {
            return Err(TrajectoryReadError::Truncated {
                frame: frames.len(),
            });
        }
        frames.push(model.close(frames.len(), cell));
    }

    let expected = frames
        .first()
        .map(Frame::atom_count)
        .ok_or(TrajectoryReadError::Empty)?;
    check_atom_counts(&frames, expected)?;
    Ok(frames)
}

/// Reads the atom records of the first model, for use as a topology.
///
/// Element columns that are blank or unrecognised yield `None`.
pub fn read_atoms<R: BufRead>(
    reader: R,
) -> Result<Vec<(PdbAtom, [f64; 3])>, TrajectoryReadError> {
    let mut atoms = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        match record_name(&line) {
            record @ ("ATOM" | "HETATM") => {
                let residue_id = columns(&line, 22, 26).trim();
                let atom = PdbAtom {
                    name: columns(&line, 12, 16).trim().to_string(),
                    residue_name: columns(&line, 17, 20).trim().to_string(),
                    chain_id: columns(&line, 21, 22).chars().next().unwrap_or(' '),
                    residue_id: residue_id.parse().map_err(|_| {
                        TrajectoryReadError::malformed(
                            line_no,
                            format!("invalid residue number '{residue_id}'"),
                        )
                    })?,
                    insertion_code: columns(&line, 26, 27).chars().next().unwrap_or(' '),
                    element: columns(&line, 76, 78).trim().parse().ok(),
                    hetero: record == "HETATM",
                };
                atoms.push((atom, parse_position(&line, line_no)?));
            }
            "ENDMDL" | "END" if !atoms.is_empty() => break,
            _ => {}
        }
    }
    if atoms.is_empty() {
        return Err(TrajectoryReadError::Empty);
    }
    Ok(atoms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::metadata::{AtomResidueInfo, StandardResidue};
    use crate::model::structure::Atom;
    use std::io::Cursor;

    fn water_structure() -> Structure {
        let mut s = Structure::new();
        for (name, element, pos) in [
            ("O", Element::O, [1.0, 2.0, 3.0]),
            ("H1", Element::H, [1.9572, 2.0, 3.0]),
            ("H2", Element::H, [0.76, 2.93, 3.0]),
        ] {
            s.push_atom(
                Atom::new(element, pos),
                AtomResidueInfo::builder(name, "HOH", 1, 'W')
                    .standard_name(Some(StandardResidue::HOH))
                    .category(ResidueCategory::Standard)
                    .build(),
            );
        }
        s
    }

    fn frame(index: usize, positions: Vec<[f64; 3]>) -> Frame {
        Frame {
            index,
            step: index as u64 * 500,
            time: index as f64,
            positions,
            potential_energy: Some(-10.5 - index as f64),
            temperature: Some(300.0),
            box_vectors: None,
        }
    }

    fn write_two_frames() -> String {
        let s = water_structure();
        let mut writer =
            PdbTrajectoryWriter::new(Vec::new(), PdbAtom::from_structure(&s), None).unwrap();
        writer.write_frame(&frame(0, s.positions())).unwrap();
        let moved: Vec<_> = s.positions().iter().map(|p| [p[0] + 0.5, p[1], p[2]]).collect();
        writer.write_frame(&frame(1, moved)).unwrap();
        writer.finish().unwrap();
        assert_eq!(writer.frames_written(), 2);
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn atom_line_has_fixed_columns() {
        let atom = PdbAtom {
            name: "CA".into(),
            residue_name: "ALA".into(),
            chain_id: 'A',
            residue_id: 12,
            insertion_code: ' ',
            element: Some(Element::C),
            hetero: false,
        };
        let line = format_atom_line(7, &atom, [11.104, -6.134, 0.5]);
        assert_eq!(
            line,
            "ATOM      7  CA  ALA A  12      11.104  -6.134   0.500  1.00  0.00           C"
        );
        assert_eq!(line.len(), 78);
        assert_eq!(&line[12..16], " CA ");
        assert_eq!(&line[30..38], "  11.104");
    }

    #[test]
    fn ion_is_written_as_hetatm() {
        let atom = PdbAtom {
            name: "NA".into(),
            residue_name: "NA".into(),
            chain_id: 'I',
            residue_id: 1,
            insertion_code: ' ',
            element: Some(Element::Na),
            hetero: true,
        };
        let line = format_atom_line(1, &atom, [0.0; 3]);
        assert!(line.starts_with("HETATM"));
        assert!(line.ends_with("NA"));
    }

    #[test]
    fn frames_read_back_with_annotations() {
        let text = write_two_frames();
        assert!(text.contains("REMARK 250 FRAME 1 STEP 500 TIME 1.0000 EPOT -11.5000 TEMP 300.00"));
        assert!(text.trim_end().ends_with("END"));

        let frames = read_frames(Cursor::new(text)).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].index, 1);
        assert_eq!(frames[1].step, 500);
        assert_eq!(frames[1].potential_energy, Some(-11.5));
        assert_eq!(frames[1].temperature, Some(300.0));
        assert!((frames[1].positions[0][0] - 1.5).abs() < 1e-3);
    }

    #[test]
    fn partial_file_without_end_is_still_readable() {
        let text = write_two_frames();
        let without_end = text.trim_end().trim_end_matches("END").to_string();
        let frames = read_frames(Cursor::new(without_end)).unwrap();
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn model_cut_off_mid_frame_is_truncated() {
        let text = write_two_frames();
        let cut = &text[..text.rfind("ENDMDL").unwrap()];
        let err = read_frames(Cursor::new(cut.to_string())).unwrap_err();
        assert!(matches!(err, TrajectoryReadError::Truncated { frame: 1 }));

        let mid_line = &cut[..cut.len() - 20];
        let err = read_frames(Cursor::new(mid_line.to_string())).unwrap_err();
        assert!(matches!(err, TrajectoryReadError::Truncated { frame: 1 }));
    }

    #[test]
    fn inconsistent_model_sizes_are_rejected() {
        let text = write_two_frames();
        let second = text.rfind("MODEL").unwrap();
        let (head, tail) = text.split_at(second);
        let mut lines: Vec<&str> = tail.lines().collect();
        lines.remove(2);
        let broken = format!("{head}{}\n", lines.join("\n"));
        let err = read_frames(Cursor::new(broken)).unwrap_err();
        assert!(matches!(
            err,
            TrajectoryReadError::AtomCountMismatch {
                frame: 1,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn single_structure_is_one_frame() {
        let text = "ATOM      1  O   HOH W   1       1.000   2.000   3.000  1.00  0.00           O\nEND\n";
        let frames = read_frames(Cursor::new(text)).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].step, 0);
        assert_eq!(frames[0].potential_energy, None);
    }

    #[test]
    fn empty_input_is_empty_error() {
        let err = read_frames(Cursor::new("REMARK nothing here\n")).unwrap_err();
        assert!(matches!(err, TrajectoryReadError::Empty));
    }

    #[test]
    fn cryst1_sets_frame_box() {
        let s = water_structure();
        let box_vectors = [[25.0, 0.0, 0.0], [0.0, 26.0, 0.0], [0.0, 0.0, 27.0]];
        let mut writer =
            PdbTrajectoryWriter::new(Vec::new(), PdbAtom::from_structure(&s), Some(box_vectors))
                .unwrap();
        writer.write_frame(&frame(0, s.positions())).unwrap();
        writer.finish().unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert!(text.contains("CRYST1   25.000   26.000   27.000  90.00  90.00  90.00 P 1"));

        let frames = read_frames(Cursor::new(text)).unwrap();
        let v = frames[0].box_vectors.unwrap();
        assert!((v[1][1] - 26.0).abs() < 1e-6);
        assert!(v[1][0].abs() < 1e-9);
    }

    #[test]
    fn atom_records_of_first_model_become_topology() {
        let text = write_two_frames();
        let atoms = read_atoms(Cursor::new(text)).unwrap();
        assert_eq!(atoms.len(), 3);
        assert_eq!(atoms[1].0.name, "H1");
        assert_eq!(atoms[1].0.residue_name, "HOH");
        assert_eq!(atoms[1].0.chain_id, 'W');
        assert_eq!(atoms[1].0.element, Some(Element::H));
        assert!(!atoms[1].0.hetero);
    }

    #[test]
    fn wrong_frame_size_is_rejected_by_writer() {
        let s = water_structure();
        let mut writer =
            PdbTrajectoryWriter::new(Vec::new(), PdbAtom::from_structure(&s), None).unwrap();
        let err = writer.write_frame(&frame(0, vec![[0.0; 3]])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected_before_writing() {
        let s = water_structure();
        let mut writer =
            PdbTrajectoryWriter::new(Vec::new(), PdbAtom::from_structure(&s), None).unwrap();
        writer.write_frame(&frame(0, s.positions())).unwrap();

        let mut far = s.positions();
        far[2][1] = -1000.5;
        let err = writer.write_frame(&frame(1, far)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(err.to_string().contains("atom 3"));
        assert_eq!(writer.frames_written(), 1);

        let mut edge = s.positions();
        edge[0] = [9999.999, -999.999, 0.0];
        writer.write_frame(&frame(1, edge)).unwrap();

        let frames = read_frames(Cursor::new(writer.into_inner())).unwrap();
        assert_eq!(frames.len(), 2);
        assert!((frames[1].positions[0][0] - 9999.999).abs() < 1e-9);
        assert!((frames[1].positions[0][1] + 999.999).abs() < 1e-9);
    }
}
