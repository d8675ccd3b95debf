//! DNA sequence utilities
//!
//! Alignments on the reverse strand store the reverse complement of the
//! sequenced bases. These helpers restore the original orientation before
//! a read is written as FASTQ.

/// Complement a single base
///
/// Supports IUPAC ambiguity codes and preserves case; anything else maps to `N`.
#[inline]
pub fn complement_base(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'a' => b't',
        b't' => b'a',
        b'g' => b'c',
        b'c' => b'g',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        b'S' | b'W' | b'N' | b's' | b'w' | b'n' => base,
        b'r' => b'y',
        b'y' => b'r',
        b'k' => b'm',
        b'm' => b'k',
        b'b' => b'v',
        b'v' => b'b',
        b'd' => b'h',
        b'h' => b'd',
        _ => b'N',
    }
}

/// Reverse complement of a sequence
///
/// # Examples
/// ```
/// use fast_bam2fq::core::dna::revcomp;
/// assert_eq!(revcomp(b"AACGT"), b"ACGTT".to_vec());
/// ```
pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement_base(b)).collect()
}

/// Reverse complement in place
pub fn revcomp_in_place(seq: &mut [u8]) {
    seq.reverse();
    for b in seq.iter_mut() {
        *b = complement_base(*b);
    }
}

/// Reverse a quality string to follow a reverse-complemented sequence
pub fn reverse_qualities(qual: &[u8]) -> Vec<u8> {
    qual.iter().rev().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complement_base() {
        assert_eq!(complement_base(b'A'), b'T');
        assert_eq!(complement_base(b'g'), b'c');
        assert_eq!(complement_base(b'R'), b'Y');
        assert_eq!(complement_base(b'N'), b'N');
        assert_eq!(complement_base(b'.'), b'N');
    }

    #[test]
    fn test_revcomp() {
        assert_eq!(revcomp(b"ACGT"), b"ACGT".to_vec());
        assert_eq!(revcomp(b"AACGT"), b"ACGTT".to_vec());
        assert_eq!(revcomp(b""), Vec::<u8>::new());
    }

    #[test]
    fn test_revcomp_in_place_matches_revcomp() {
        let mut seq = b"GATTACAn".to_vec();
        let expected = revcomp(&seq);
        revcomp_in_place(&mut seq);
        assert_eq!(seq, expected);
    }

    #[test]
    fn test_reverse_qualities() {
        assert_eq!(reverse_qualities(&[10, 20, 30, 40]), vec![40, 30, 20, 10]);
    }
}
