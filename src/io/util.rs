//! Conversions between the crate's [`Structure`] and the `bio-forge` model.

use crate::model::{
    metadata::{AtomResidueInfo, BioMetadata, ResidueCategory, ResiduePosition, StandardResidue},
    structure::{Atom, Bond, Structure},
    types::{BondOrder, Element},
};
use bio_forge as bf;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("atom '{atom}' in residue {residue} has an unknown element")]
    UnknownElement { atom: String, residue: String },
    #[error("element '{0}' is not supported by this crate")]
    UnsupportedElement(String),
    #[error("atom count ({atoms}) and residue annotation count ({info}) differ")]
    MetadataLength { atoms: usize, info: usize },
    #[error("bond {i}-{j} references an atom outside the structure")]
    BondOutOfRange { i: usize, j: usize },
}

/// Converts a `bio-forge` structure into a bond-less [`Structure`], keeping
/// chain, residue and atom order.
pub fn from_bio_structure(bio_struct: &bf::Structure) -> Result<Structure, ConversionError> {
    let atom_count = bio_struct.atom_count();
    let mut atoms = Vec::with_capacity(atom_count);
    let mut metadata = BioMetadata::with_capacity(atom_count);

    for (chain, residue, bio_atom) in bio_struct.iter_atoms_with_context() {
        if matches!(bio_atom.element, bf::Element::Unknown) {
            return Err(ConversionError::UnknownElement {
                atom: bio_atom.name.to_string(),
                residue: format!("{} {}", residue.name, residue.id),
            });
        }
        let symbol = bio_atom.element.symbol();
        let element = Element::from_str(symbol)
            .map_err(|_| ConversionError::UnsupportedElement(symbol.to_string()))?;

        atoms.push(Atom::new(
            element,
            [bio_atom.pos.x, bio_atom.pos.y, bio_atom.pos.z],
        ));

        metadata.atom_info.push(
            AtomResidueInfo::builder(
                bio_atom.name.to_string(),
                residue.name.to_string(),
                residue.id,
                chain.id.chars().next().unwrap_or(' '),
            )
            .insertion_code_opt(residue.insertion_code)
            .standard_name(standard_from_bf(residue.standard_name))
            .category(category_from_bf(residue.category))
            .position(position_from_bf(residue.position))
            .build(),
        );
    }

    Ok(Structure {
        atoms,
        bonds: Vec::new(),
        box_vectors: bio_struct.box_vectors,
        metadata,
    })
}

/// Converts a `bio-forge` topology, including its perceived bonds.
pub fn from_bio_topology(bio_topo: &bf::Topology) -> Result<Structure, ConversionError> {
    let mut structure = from_bio_structure(bio_topo.structure())?;
    let atom_count = structure.atom_count();

    structure.bonds = bio_topo
        .bonds()
        .iter()
        .map(|b| {
            if b.a1_idx >= atom_count || b.a2_idx >= atom_count {
                return Err(ConversionError::BondOutOfRange {
                    i: b.a1_idx,
                    j: b.a2_idx,
                });
            }
            Ok(Bond::new(b.a1_idx, b.a2_idx, bond_order_from_bf(b.order)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(structure)
}

/// Converts a [`Structure`] into a `bio-forge` structure. Residues keep
/// their first-appearance order, chains likewise.
pub fn to_bio_structure(structure: &Structure) -> Result<bf::Structure, ConversionError> {
    let info = &structure.metadata.atom_info;
    if info.len() != structure.atoms.len() {
        return Err(ConversionError::MetadataLength {
            atoms: structure.atoms.len(),
            info: info.len(),
        });
    }

    let mut chains: Vec<bf::Chain> = Vec::new();
    let mut chain_index: HashMap<char, usize> = HashMap::new();
    let mut pending: Option<(char, bf::Residue)> = None;

    let mut flush = |pending: Option<(char, bf::Residue)>, chains: &mut Vec<bf::Chain>| {
        if let Some((chain_id, residue)) = pending {
            let idx = *chain_index.entry(chain_id).or_insert_with(|| {
                chains.push(bf::Chain::new(&chain_id.to_string()));
                chains.len() - 1
            });
            chains[idx].add_residue(residue);
        }
    };

    for span in structure.residues() {
        flush(pending.take(), &mut chains);

        let first = span.info;
        let mut residue = bf::Residue::new(
            first.residue_id,
            Some(first.insertion_code).filter(|&c| c != ' '),
            &first.residue_name,
            standard_to_bf(first.standard_name),
            category_to_bf(first.category),
        );
        residue.position = position_to_bf(first.position);

        for idx in span.atoms.clone() {
            let atom = &structure.atoms[idx];
            let element = bf::Element::from_str(atom.element.symbol())
                .map_err(|_| ConversionError::UnsupportedElement(atom.element.to_string()))?;
            residue.add_atom(bf::Atom::new(
                &info[idx].atom_name,
                element,
                bf::Point::new(atom.position[0], atom.position[1], atom.position[2]),
            ));
        }
        pending = Some((first.chain_id, residue));
    }
    flush(pending.take(), &mut chains);

    let mut bio_struct = bf::Structure::new();
    bio_struct.box_vectors = structure.box_vectors;
    for chain in chains {
        bio_struct.add_chain(chain);
    }
    Ok(bio_struct)
}

pub fn to_bio_topology(structure: &Structure) -> Result<bf::Topology, ConversionError> {
    let bio_struct = to_bio_structure(structure)?;
    let bonds = structure
        .bonds
        .iter()
        .map(|b| bf::Bond::new(b.i, b.j, bond_order_to_bf(b.order)))
        .collect();
    Ok(bf::Topology::new(bio_struct, bonds))
}

fn bond_order_from_bf(order: bf::BondOrder) -> BondOrder {
    match order {
        bf::BondOrder::Single => BondOrder::Single,
        bf::BondOrder::Double => BondOrder::Double,
        bf::BondOrder::Triple => BondOrder::Triple,
        bf::BondOrder::Aromatic => BondOrder::Aromatic,
    }
}

fn bond_order_to_bf(order: BondOrder) -> bf::BondOrder {
    match order {
        BondOrder::Single => bf::BondOrder::Single,
        BondOrder::Double => bf::BondOrder::Double,
        BondOrder::Triple => bf::BondOrder::Triple,
        BondOrder::Aromatic => bf::BondOrder::Aromatic,
    }
}

fn standard_from_bf(res: Option<bf::StandardResidue>) -> Option<StandardResidue> {
    res.map(|v| match v {
        bf::StandardResidue::ALA => StandardResidue::ALA,
        bf::StandardResidue::ARG => StandardResidue::ARG,
        bf::StandardResidue::ASN => StandardResidue::ASN,
        bf::StandardResidue::ASP => StandardResidue::ASP,
        bf::StandardResidue::CYS => StandardResidue::CYS,
        bf::StandardResidue::GLN => StandardResidue::GLN,
        bf::StandardResidue::GLU => StandardResidue::GLU,
        bf::StandardResidue::GLY => StandardResidue::GLY,
        bf::StandardResidue::HIS => StandardResidue::HIS,
        bf::StandardResidue::ILE => StandardResidue::ILE,
        bf::StandardResidue::LEU => StandardResidue::LEU,
        bf::StandardResidue::LYS => StandardResidue::LYS,
        bf::StandardResidue::MET => StandardResidue::MET,
        bf::StandardResidue::PHE => StandardResidue::PHE,
        bf::StandardResidue::PRO => StandardResidue::PRO,
        bf::StandardResidue::SER => StandardResidue::SER,
        bf::StandardResidue::THR => StandardResidue::THR,
        bf::StandardResidue::TRP => StandardResidue::TRP,
        bf::StandardResidue::TYR => StandardResidue::TYR,
        bf::StandardResidue::VAL => StandardResidue::VAL,
        bf::StandardResidue::A => StandardResidue::A,
        bf::StandardResidue::C => StandardResidue::C,
        bf::StandardResidue::G => StandardResidue::G,
        bf::StandardResidue::U => StandardResidue::U,
        bf::StandardResidue::I => StandardResidue::I,
        bf::StandardResidue::DA => StandardResidue::DA,
        bf::StandardResidue::DC => StandardResidue::DC,
        bf::StandardResidue::DG => StandardResidue::DG,
        bf::StandardResidue::DT => StandardResidue::DT,
        bf::StandardResidue::DI => StandardResidue::DI,
        bf::StandardResidue::HOH => StandardResidue::HOH,
    })
}

fn standard_to_bf(res: Option<StandardResidue>) -> Option<bf::StandardResidue> {
    res.map(|v| match v {
        StandardResidue::ALA => bf::StandardResidue::ALA,
        StandardResidue::ARG => bf::StandardResidue::ARG,
        StandardResidue::ASN => bf::StandardResidue::ASN,
        StandardResidue::ASP => bf::StandardResidue::ASP,
        StandardResidue::CYS => bf::StandardResidue::CYS,
        StandardResidue::GLN => bf::StandardResidue::GLN,
        StandardResidue::GLU => bf::StandardResidue::GLU,
        StandardResidue::GLY => bf::StandardResidue::GLY,
        StandardResidue::HIS => bf::StandardResidue::HIS,
        StandardResidue::ILE => bf::StandardResidue::ILE,
        StandardResidue::LEU => bf::StandardResidue::LEU,
        StandardResidue::LYS => bf::StandardResidue::LYS,
        StandardResidue::MET => bf::StandardResidue::MET,
        StandardResidue::PHE => bf::StandardResidue::PHE,
        StandardResidue::PRO => bf::StandardResidue::PRO,
        StandardResidue::SER => bf::StandardResidue::SER,
        StandardResidue::THR => bf::StandardResidue::THR,
        StandardResidue::TRP => bf::StandardResidue::TRP,
        StandardResidue::TYR => bf::StandardResidue::TYR,
        StandardResidue::VAL => bf::StandardResidue::VAL,
        StandardResidue::A => bf::StandardResidue::A,
        StandardResidue::C => bf::StandardResidue::C,
        StandardResidue::G => bf::StandardResidue::G,
        StandardResidue::U => bf::StandardResidue::U,
        StandardResidue::I => bf::StandardResidue::I,
        StandardResidue::DA => bf::StandardResidue::DA,
        StandardResidue::DC => bf::StandardResidue::DC,
        StandardResidue::DG => bf::StandardResidue::DG,
        StandardResidue::DT => bf::StandardResidue::DT,
        StandardResidue::DI => bf::StandardResidue::DI,
        StandardResidue::HOH => bf::StandardResidue::HOH,
    })
}

fn category_from_bf(cat: bf::ResidueCategory) -> ResidueCategory {
    match cat {
        bf::ResidueCategory::Standard => ResidueCategory::Standard,
        bf::ResidueCategory::Hetero => ResidueCategory::Hetero,
        bf::ResidueCategory::Ion => ResidueCategory::Ion,
    }
}

fn category_to_bf(cat: ResidueCategory) -> bf::ResidueCategory {
    match cat {
        ResidueCategory::Standard => bf::ResidueCategory::Standard,
        ResidueCategory::Hetero => bf::ResidueCategory::Hetero,
        ResidueCategory::Ion => bf::ResidueCategory::Ion,
    }
}

fn position_from_bf(pos: bf::ResiduePosition) -> ResiduePosition {
    match pos {
        bf::ResiduePosition::None => ResiduePosition::None,
        bf::ResiduePosition::Internal => ResiduePosition::Internal,
        bf::ResiduePosition::NTerminal => ResiduePosition::NTerminal,
        bf::ResiduePosition::CTerminal => ResiduePosition::CTerminal,
        bf::ResiduePosition::FivePrime => ResiduePosition::FivePrime,
        bf::ResiduePosition::ThreePrime => ResiduePosition::ThreePrime,
    }
}

fn position_to_bf(pos: ResiduePosition) -> bf::ResiduePosition {
    match pos {
        ResiduePosition::None => bf::ResiduePosition::None,
        ResiduePosition::Internal => bf::ResiduePosition::Internal,
        ResiduePosition::NTerminal => bf::ResiduePosition::NTerminal,
        ResiduePosition::CTerminal => bf::ResiduePosition::CTerminal,
        ResiduePosition::FivePrime => bf::ResiduePosition::FivePrime,
        ResiduePosition::ThreePrime => bf::ResiduePosition::ThreePrime,
    }
}

/// Parses `text`, re-reading residues `bio-forge` has no standard template
/// for as hetero groups.
///
/// On [`bf::io::Error::UnknownStandardResidue`] the `ATOM` records of that
/// residue are rewritten to `HETATM` by `demote` and parsing is retried.
/// Each retry demotes at least one record, so the loop terminates. The
/// residue then reaches the force-field coverage check instead of failing
/// the load.
pub fn parse_with_unknown_as_hetero<P>(
    mut text: String,
    parse: P,
    demote: fn(&str, &str) -> Option<String>,
) -> Result<bf::Structure, bf::io::Error>
where
    P: Fn(&str) -> Result<bf::Structure, bf::io::Error>,
{
    loop {
        let err = match parse(&text) {
            Ok(structure) => return Ok(structure),
            Err(err) => err,
        };
        let residue = match &err {
            bf::io::Error::UnknownStandardResidue { name, .. } => Some(name.clone()),
            _ => None,
        };
        let Some((residue, rewritten)) =
            residue.and_then(|name| demote(&text, &name).map(|t| (name, t)))
        else {
            return Err(err);
        };
        log::warn!("residue {residue} has no standard template; reading it as a hetero group");
        text = rewritten;
    }
}

/// `ATOM` records of `residue` (columns 18-20) turned into `HETATM`.
pub fn pdb_unknown_as_hetero(text: &str, residue: &str) -> Option<String> {
    rewrite_lines(text, |line| {
        (line.starts_with("ATOM  ") && line.get(17..20).map(str::trim) == Some(residue))
            .then(|| format!("HETATM{}", &line[6..]))
    })
}

/// `_atom_site` rows grouped as `ATOM` that name `residue`, regrouped as
/// `HETATM`.
pub fn mmcif_unknown_as_hetero(text: &str, residue: &str) -> Option<String> {
    rewrite_lines(text, |line| {
        let mut tokens = line.split_whitespace();
        let group = tokens.next()?;
        (group.eq_ignore_ascii_case("ATOM") && tokens.any(|t| t == residue))
            .then(|| line.replacen(group, "HETATM", 1))
    })
}

/// `None` when `rewrite` left every line alone.
fn rewrite_lines(text: &str, rewrite: impl Fn(&str) -> Option<String>) -> Option<String> {
    let mut changed = false;
    let mut out = String::with_capacity(text.len() + 64);
    for line in text.split_inclusive('\n') {
        match rewrite(line) {
            Some(new) => {
                out.push_str(&new);
                changed = true;
            }
            None => out.push_str(line),
        }
    }
    changed.then_some(out)
}
