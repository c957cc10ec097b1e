use crate::core::elements::Element;
use crate::core::io::traits::StructureFile;
use crate::core::models::atom::{Atom, AtomTag};
use crate::core::models::cell::Cell;
use crate::core::models::structure::AtomicStructure;
use itertools::Itertools;
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XyzMetadata {
    /// Potential energy of the frame in eV, when recorded.
    pub energy: Option<f64>,
}

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("File contains no frames")]
    Empty,
}

fn parse_error(line: usize, message: impl Into<String>) -> XyzError {
    XyzError::Parse {
        line,
        message: message.into(),
    }
}

/// Extended XYZ with species, positions and anomaly tags per atom, and the cell,
/// periodic flags and energy in the comment line.
pub struct XyzFile;

impl StructureFile for XyzFile {
    type Metadata = XyzMetadata;
    type Error = XyzError;

    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(AtomicStructure, Self::Metadata), Self::Error> {
        read_frames(reader)?.into_iter().next().ok_or(XyzError::Empty)
    }

    fn write_to(
        structure: &AtomicStructure,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        write_frame(structure, metadata.energy, writer)
    }
}

fn flag(value: bool) -> char {
    if value { 'T' } else { 'F' }
}

/// Appends one frame to `writer`.
pub fn write_frame(
    structure: &AtomicStructure,
    energy: Option<f64>,
    writer: &mut impl Write,
) -> Result<(), XyzError> {
    writeln!(writer, "{}", structure.len())?;

    let mut comment = Vec::new();
    if !structure.cell().is_zero() {
        let lattice = structure
            .cell()
            .vectors()
            .iter()
            .flat_map(|v| v.iter())
            .map(|c| format!("{:.8}", c))
            .join(" ");
        comment.push(format!("Lattice=\"{}\"", lattice));
    }
    comment.push("Properties=species:S:1:pos:R:3:tags:I:1".to_string());
    if let Some(energy) = energy {
        comment.push(format!("energy={:.10}", energy));
    }
    let pbc = structure.pbc();
    comment.push(format!(
        "pbc=\"{} {} {}\"",
        flag(pbc[0]),
        flag(pbc[1]),
        flag(pbc[2])
    ));
    writeln!(writer, "{}", comment.join(" "))?;

    for atom in structure.atoms() {
        writeln!(
            writer,
            "{:<2} {:>16.8} {:>16.8} {:>16.8} {}",
            atom.element.symbol(),
            atom.position.x,
            atom.position.y,
            atom.position.z,
            atom.tag.as_u8()
        )?;
    }
    Ok(())
}

/// Splits an extended-XYZ comment line into lowercase keys and raw values. Bare
/// keys map to `"T"`.
fn parse_comment(comment: &str, line: usize) -> Result<HashMap<String, String>, XyzError> {
    let chars: Vec<char> = comment.chars().collect();
    let mut fields = HashMap::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i] != '=' && !chars[i].is_whitespace() {
            i += 1;
        }
        let key: String = chars[start..i].iter().collect::<String>().to_ascii_lowercase();
        if i >= chars.len() || chars[i] != '=' {
            fields.insert(key, "T".to_string());
            continue;
        }
        i += 1;
        let value: String = if chars.get(i) == Some(&'"') {
            i += 1;
            let value_start = i;
            while i < chars.len() && chars[i] != '"' {
                i += 1;
            }
            if i >= chars.len() {
                return Err(parse_error(line, format!("Unterminated quote for '{}'", key)));
            }
            let value = chars[value_start..i].iter().collect();
            i += 1;
            value
        } else {
            let value_start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            chars[value_start..i].iter().collect()
        };
        fields.insert(key, value);
    }
    Ok(fields)
}

/// Column layout derived from the `Properties` field.
struct Columns {
    species: usize,
    position: usize,
    tags: Option<usize>,
    width: usize,
}

fn parse_properties(properties: Option<&String>, line: usize) -> Result<Columns, XyzError> {
    let Some(properties) = properties else {
        return Ok(Columns {
            species: 0,
            position: 1,
            tags: None,
            width: 4,
        });
    };
    let parts: Vec<&str> = properties.split(':').collect();
    if parts.len() % 3 != 0 {
        return Err(parse_error(line, format!("Malformed Properties '{}'", properties)));
    }
    let (mut species, mut position, mut tags) = (None, None, None);
    let mut column = 0;
    for triple in parts.chunks(3) {
        let width: usize = triple[2]
            .parse()
            .map_err(|_| parse_error(line, format!("Bad column count in '{}'", properties)))?;
        match triple[0].to_ascii_lowercase().as_str() {
            "species" => species = Some(column),
            "pos" => position = Some(column),
            "tags" => tags = Some(column),
            _ => {}
        }
        column += width;
    }
    match (species, position) {
        (Some(species), Some(position)) => Ok(Columns {
            species,
            position,
            tags,
            width: column,
        }),
        _ => Err(parse_error(line, "Properties must include species and pos")),
    }
}

fn parse_floats(text: &str, expected: usize, line: usize, what: &str) -> Result<Vec<f64>, XyzError> {
    let values: Vec<f64> = text
        .split_whitespace()
        .map(|v| v.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| parse_error(line, format!("Invalid {} '{}'", what, text)))?;
    if values.len() != expected {
        return Err(parse_error(
            line,
            format!("{} needs {} values, found {}", what, expected, values.len()),
        ));
    }
    Ok(values)
}

/// Reads every frame of a (possibly multi-frame) extended-XYZ stream.
pub fn read_frames(
    reader: &mut impl BufRead,
) -> Result<Vec<(AtomicStructure, XyzMetadata)>, XyzError> {
    let mut lines = reader.lines().enumerate().map(|(i, l)| (i + 1, l));
    let mut frames = Vec::new();

    while let Some((line_no, header)) = lines.next() {
        let header = header?;
        if header.trim().is_empty() {
            continue;
        }
        let count: usize = header
            .trim()
            .parse()
            .map_err(|_| parse_error(line_no, format!("Expected atom count, found '{}'", header.trim())))?;

        let (comment_no, comment) = lines
            .next()
            .ok_or_else(|| parse_error(line_no + 1, "Missing comment line"))?;
        let fields = parse_comment(&comment?, comment_no)?;
        let columns = parse_properties(fields.get("properties"), comment_no)?;

        let cell = match fields.get("lattice") {
            Some(lattice) => {
                let v = parse_floats(lattice, 9, comment_no, "Lattice")?;
                Cell::new(
                    Vector3::new(v[0], v[1], v[2]),
                    Vector3::new(v[3], v[4], v[5]),
                    Vector3::new(v[6], v[7], v[8]),
                )
            }
            None => Cell::default(),
        };
        let pbc = match fields.get("pbc") {
            Some(pbc) => {
                let flags: Vec<bool> = pbc
                    .split_whitespace()
                    .map(|f| matches!(f, "T" | "t" | "True" | "true" | "1"))
                    .collect();
                if flags.len() != 3 {
                    return Err(parse_error(comment_no, format!("Invalid pbc '{}'", pbc)));
                }
                [flags[0], flags[1], flags[2]]
            }
            None => [!cell.is_zero(); 3],
        };
        let energy = fields
            .get("energy")
            .map(|e| {
                e.parse::<f64>()
                    .map_err(|_| parse_error(comment_no, format!("Invalid energy '{}'", e)))
            })
            .transpose()?;

        let mut atoms = Vec::with_capacity(count);
        for _ in 0..count {
            let (atom_no, atom_line) = lines
                .next()
                .ok_or_else(|| parse_error(line_no, format!("Expected {} atom lines", count)))?;
            let atom_line = atom_line?;
            let parts: Vec<&str> = atom_line.split_whitespace().collect();
            if parts.len() < columns.width {
                return Err(parse_error(
                    atom_no,
                    format!("Expected {} columns, found {}", columns.width, parts.len()),
                ));
            }
            let element = Element::from_symbol(parts[columns.species])
                .map_err(|e| parse_error(atom_no, e.to_string()))?;
            let coords = parse_floats(
                &parts[columns.position..columns.position + 3].join(" "),
                3,
                atom_no,
                "position",
            )?;
            let tag = match columns.tags {
                Some(column) => parts[column]
                    .parse::<AtomTag>()
                    .map_err(|_| parse_error(atom_no, format!("Invalid tag '{}'", parts[column])))?,
                None => AtomTag::default(),
            };
            atoms.push(
                Atom::new(element, Point3::new(coords[0], coords[1], coords[2])).with_tag(tag),
            );
        }

        frames.push((AtomicStructure::new(atoms, cell, pbc), XyzMetadata { energy }));
    }
    Ok(frames)
}
