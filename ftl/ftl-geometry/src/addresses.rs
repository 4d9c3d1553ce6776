use core::fmt;

/// Logical Block Address: the host-facing page index.
///
/// Carries intent only; the exposed LBA range is decided by the translation
/// layer, not by this type.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lba(u32);

impl Lba {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Lba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LBA({})", self.0)
    }
}

impl fmt::Display for Lba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Lba {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

/// Physical Block Address: the flattened page index into the physical array.
///
/// Despite the historical name this addresses a **page**, not a block; see the
/// crate docs for the encoding. Use [`Geometry::page_addr`](crate::Geometry::page_addr)
/// to decompose it.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pba(u32);

impl Pba {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Pba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PBA({})", self.0)
    }
}

impl fmt::Display for Pba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Virtual Block Number within a (die, plane).
///
/// The stable identity the allocator and garbage collector reason about. A
/// `Vbn` survives bad-block replacement; its backing [`Pbn`] does not.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Vbn(u32);

impl Vbn {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// The physical block of the same index, i.e. the identity backing.
    #[inline]
    #[must_use]
    pub const fn identity_pbn(self) -> Pbn {
        Pbn(self.0)
    }
}

impl fmt::Debug for Vbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VBN({})", self.0)
    }
}

impl fmt::Display for Vbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical Block Number within a (die, plane).
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pbn(u32);

impl Pbn {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Pbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PBN({})", self.0)
    }
}

impl fmt::Display for Pbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical block location: die, plane and block number.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct BlockAddr {
    pub die: u32,
    pub plane: u32,
    pub block: Pbn,
}

impl BlockAddr {
    #[inline]
    #[must_use]
    pub const fn new(die: u32, plane: u32, block: Pbn) -> Self {
        Self { die, plane, block }
    }

    /// The page at offset `page` inside this block.
    #[inline]
    #[must_use]
    pub const fn page(self, page: u32) -> PageAddr {
        PageAddr { block: self, page }
    }
}

impl fmt::Debug for BlockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}/p{}/b{}", self.die, self.plane, self.block)
    }
}

/// A fully decomposed physical page location.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct PageAddr {
    pub block: BlockAddr,
    pub page: u32,
}

impl fmt::Debug for PageAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/g{}", self.block, self.page)
    }
}
