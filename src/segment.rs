use std::fmt;

/// Stable arena index of a segment within an `AssemblyGraph`.
/// Ids are never reused while the graph is alive, so a `SegmentId`
/// held across a removal simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct SegmentId(pub u32);

impl SegmentId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which strand of the underlying contig a segment represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn sign_char(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }

    pub fn flip(&self) -> Strand {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }
}

/// Compute the reverse complement of a DNA sequence
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&base| match base {
            b'A' | b'a' => b'T',
            b'T' | b't' => b'A',
            b'C' | b'c' => b'G',
            b'G' | b'g' => b'C',
            b'N' | b'n' => b'N',
            _ => base, // Keep any other characters unchanged
        })
        .collect()
}

/// One strand of a contig/unitig in the assembly graph.
///
/// Segments always exist in reverse-complement pairs: the graph creates
/// both strands together and `rc` points at the partner, which points
/// straight back. The pair shares one base `name`; the rendered name
/// carries the strand sign (`utg1+` / `utg1-`).
#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    pub strand: Strand,
    pub length: usize,
    /// Raw bases, absent when the input carried no sequence for this node.
    pub sequence: Option<Vec<u8>>,
    /// Read depth / coverage reported by the assembler.
    pub depth: f64,
    pub(crate) rc: SegmentId,
}

impl Segment {
    /// The paired reverse-complement segment. Set once at creation,
    /// never reassigned.
    pub fn rc(&self) -> SegmentId {
        self.rc
    }

    /// Name with the strand sign appended, e.g. `utg1-`.
    pub fn signed_name(&self) -> String {
        format!("{}{}", self.name, self.strand.sign_char())
    }

    /// Forward-strand segments are the "positive" half of each pair,
    /// used only to avoid drawing/counting a pair twice.
    pub fn is_positive(&self) -> bool {
        self.strand == Strand::Forward
    }
}
