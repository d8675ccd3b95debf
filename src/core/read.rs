//! Sequencing read model
//!
//! The subset of an alignment record the read cache needs: pair identity,
//! self and mate coordinates, flags, and the bases to emit as FASTQ.

/// Alignment flags relevant to pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ReadFlags {
    /// Read is one segment of a multi-segment template
    pub paired: bool,
    /// Read itself is unmapped
    pub unmapped: bool,
    /// Mate is unmapped
    pub mate_unmapped: bool,
    /// Read is the first segment of the template
    pub first_of_pair: bool,
    /// Secondary alignment
    pub secondary: bool,
    /// Supplementary alignment
    pub supplementary: bool,
}

impl ReadFlags {
    /// Build flags from a raw SAM flag word
    ///
    /// # Examples
    /// ```
    /// use fast_bam2fq::core::ReadFlags;
    /// let flags = ReadFlags::from_sam(0x1 | 0x40);
    /// assert!(flags.paired && flags.first_of_pair);
    /// assert!(!flags.unmapped);
    /// ```
    pub fn from_sam(flag: u16) -> Self {
        Self {
            paired: flag & 0x1 != 0,
            unmapped: flag & 0x4 != 0,
            mate_unmapped: flag & 0x8 != 0,
            first_of_pair: flag & 0x40 != 0,
            secondary: flag & 0x100 != 0,
            supplementary: flag & 0x800 != 0,
        }
    }

    /// Secondary and supplementary records never take part in pairing
    #[inline]
    pub fn is_secondary_or_supplementary(&self) -> bool {
        self.secondary || self.supplementary
    }

    /// Both the read and its mate are unmapped
    #[inline]
    pub fn is_fully_unmapped(&self) -> bool {
        self.unmapped && self.mate_unmapped
    }
}

/// Pair-identity key: (read name, firstOfPair)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    pub name: Vec<u8>,
    pub first_of_pair: bool,
}

/// A single alignment record reduced to what pairing and FASTQ output need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencingRead {
    /// Read name, shared by both mates
    pub name: Vec<u8>,
    /// Bases in original sequencing orientation
    pub sequence: Vec<u8>,
    /// Raw Phred qualities (no ASCII offset), same orientation as `sequence`
    pub qualities: Vec<u8>,
    /// Contig of this alignment
    pub contig: Option<String>,
    /// 1-based position of this alignment
    pub position: Option<u64>,
    /// Contig of the mate
    pub mate_contig: Option<String>,
    /// 1-based position of the mate
    pub mate_position: Option<u64>,
    pub flags: ReadFlags,
}

impl SequencingRead {
    /// Create a paired read with no coordinates and empty bases
    pub fn new(name: impl Into<Vec<u8>>, first_of_pair: bool) -> Self {
        Self {
            name: name.into(),
            sequence: Vec::new(),
            qualities: Vec::new(),
            contig: None,
            position: None,
            mate_contig: None,
            mate_position: None,
            flags: ReadFlags {
                paired: true,
                unmapped: true,
                mate_unmapped: true,
                first_of_pair,
                ..ReadFlags::default()
            },
        }
    }

    /// Place this read at `contig:position` and mark it mapped
    pub fn at(mut self, contig: impl Into<String>, position: u64) -> Self {
        self.contig = Some(contig.into());
        self.position = Some(position);
        self.flags.unmapped = false;
        self
    }

    /// Place the mate at `contig:position` and mark it mapped
    pub fn with_mate_at(mut self, contig: impl Into<String>, position: u64) -> Self {
        self.mate_contig = Some(contig.into());
        self.mate_position = Some(position);
        self.flags.mate_unmapped = false;
        self
    }

    /// Attach bases and qualities
    pub fn with_bases(mut self, sequence: impl Into<Vec<u8>>, qualities: impl Into<Vec<u8>>) -> Self {
        self.sequence = sequence.into();
        self.qualities = qualities.into();
        self
    }

    pub fn with_flags(mut self, flags: ReadFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Key under which this read is buffered
    pub fn pair_key(&self) -> PairKey {
        PairKey {
            name: self.name.clone(),
            first_of_pair: self.flags.first_of_pair,
        }
    }

    /// Key under which this read's mate would be buffered
    pub fn mate_key(&self) -> PairKey {
        PairKey {
            name: self.name.clone(),
            first_of_pair: !self.flags.first_of_pair,
        }
    }
}
