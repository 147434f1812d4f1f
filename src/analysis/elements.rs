//! Element inference from PDB-style atom names.

use crate::model::types::Element;

/// What to do with atoms whose element is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementPolicy {
    /// Leave missing elements missing.
    Keep,
    /// Derive missing elements from atom names.
    #[default]
    InferMissing,
}

/// Guesses the element of atom `atom_name` in residue `residue_name`.
///
/// Leading digits are dropped (`1HB` is a hydrogen). Single-atom residues
/// whose atom is named after the residue are ions and use the whole name
/// (`NA`/`NA` is sodium, `CA`/`CA` calcium); selenomethionine's `SE` is
/// selenium. Everything else takes its first letter, which is correct for
/// the organic atoms of standard residues (`CA` in `ALA` is carbon).
pub fn infer_element(atom_name: &str, residue_name: &str) -> Option<Element> {
    let name = atom_name
        .trim()
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .to_ascii_uppercase();
    let residue = residue_name.trim().to_ascii_uppercase();
    if name.is_empty() {
        return None;
    }

    if name == residue {
        if let Ok(element) = name.parse::<Element>() {
            return Some(element);
        }
    }
    if residue == "MSE" && name == "SE" {
        return Some(Element::Se);
    }

    let first: String = name.chars().take(1).collect();
    first.parse().ok()
}
