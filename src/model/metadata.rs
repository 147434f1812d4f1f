use std::fmt;

/// Residues with library templates: the twenty amino acids, RNA/DNA
/// nucleotides, and water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardResidue {
    ALA,
    ARG,
    ASN,
    ASP,
    CYS,
    GLN,
    GLU,
    GLY,
    HIS,
    ILE,
    LEU,
    LYS,
    MET,
    PHE,
    PRO,
    SER,
    THR,
    TRP,
    TYR,
    VAL,
    A,
    C,
    G,
    U,
    I,
    DA,
    DC,
    DG,
    DT,
    DI,
    HOH,
}

impl StandardResidue {
    pub fn is_amino_acid(&self) -> bool {
        use StandardResidue::*;
        matches!(
            self,
            ALA | ARG
                | ASN
                | ASP
                | CYS
                | GLN
                | GLU
                | GLY
                | HIS
                | ILE
                | LEU
                | LYS
                | MET
                | PHE
                | PRO
                | SER
                | THR
                | TRP
                | TYR
                | VAL
        )
    }

    pub fn is_nucleotide(&self) -> bool {
        use StandardResidue::*;
        matches!(self, A | C | G | U | I | DA | DC | DG | DT | DI)
    }

    pub fn is_water(&self) -> bool {
        matches!(self, StandardResidue::HOH)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResidueCategory {
    Standard,
    Hetero,
    Ion,
}

impl fmt::Display for ResidueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResidueCategory::Standard => write!(f, "standard"),
            ResidueCategory::Hetero => write!(f, "hetero"),
            ResidueCategory::Ion => write!(f, "ion"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResiduePosition {
    None,
    Internal,
    NTerminal,
    CTerminal,
    FivePrime,
    ThreePrime,
}

/// Per-atom residue and chain annotation carried from the input structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomResidueInfo {
    pub atom_name: String,
    pub residue_name: String,
    pub residue_id: i32,
    pub chain_id: char,
    pub insertion_code: char,
    pub standard_name: Option<StandardResidue>,
    pub category: ResidueCategory,
    pub position: ResiduePosition,
}

impl AtomResidueInfo {
    pub fn builder(
        atom_name: impl Into<String>,
        residue_name: impl Into<String>,
        residue_id: i32,
        chain_id: char,
    ) -> AtomResidueBuilder {
        AtomResidueBuilder {
            info: AtomResidueInfo {
                atom_name: atom_name.into(),
                residue_name: residue_name.into(),
                residue_id,
                chain_id,
                insertion_code: ' ',
                standard_name: None,
                category: ResidueCategory::Hetero,
                position: ResiduePosition::None,
            },
        }
    }

    /// Key identifying the residue this atom belongs to.
    #[inline]
    pub fn residue_key(&self) -> (char, i32, char) {
        (self.chain_id, self.residue_id, self.insertion_code)
    }

    pub fn is_water(&self) -> bool {
        self.standard_name.is_some_and(|s| s.is_water())
    }

    pub fn is_solvent(&self) -> bool {
        self.is_water() || self.category == ResidueCategory::Ion
    }
}

#[derive(Debug, Clone)]
pub struct AtomResidueBuilder {
    info: AtomResidueInfo,
}

impl AtomResidueBuilder {
    pub fn insertion_code(mut self, code: char) -> Self {
        self.info.insertion_code = code;
        self
    }

    pub fn insertion_code_opt(mut self, code: Option<char>) -> Self {
        self.info.insertion_code = code.unwrap_or(' ');
        self
    }

    pub fn standard_name(mut self, standard: Option<StandardResidue>) -> Self {
        self.info.standard_name = standard;
        self
    }

    pub fn category(mut self, category: ResidueCategory) -> Self {
        self.info.category = category;
        self
    }

    pub fn position(mut self, position: ResiduePosition) -> Self {
        self.info.position = position;
        self
    }

    pub fn build(self) -> AtomResidueInfo {
        self.info
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BioMetadata {
    pub atom_info: Vec<AtomResidueInfo>,
}

impl BioMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            atom_info: Vec::with_capacity(capacity),
        }
    }
}
