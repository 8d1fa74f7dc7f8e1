use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Barcode encoding standard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum Symbology {
    /// EAN-13 retail code
    #[serde(rename = "EAN13")]
    Ean13,
    /// Code 128, code sets A, B and C
    #[serde(rename = "CODE128")]
    Code128,
    /// QR code, model 2
    #[serde(rename = "QRCODE")]
    QrCode,
}

impl Symbology {
    /// Every supported symbology in canonical order
    pub const ALL: [Symbology; 3] = [Symbology::Ean13, Symbology::Code128, Symbology::QrCode];

    /// Upper-case name used in configs and output
    pub fn name(self) -> &'static str {
        match self {
            Symbology::Ean13 => "EAN13",
            Symbology::Code128 => "CODE128",
            Symbology::QrCode => "QRCODE",
        }
    }

    /// One-dimensional (bar/space) symbologies read along scanlines
    pub fn is_linear(self) -> bool {
        !matches!(self, Symbology::QrCode)
    }

    fn bit(self) -> u8 {
        match self {
            Symbology::Ean13 => 0b001,
            Symbology::Code128 => 0b010,
            Symbology::QrCode => 0b100,
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Symbology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "EAN13" => Ok(Symbology::Ean13),
            "CODE128" => Ok(Symbology::Code128),
            "QR" | "QRCODE" => Ok(Symbology::QrCode),
            _ => Err(format!("unknown symbology '{s}'")),
        }
    }
}

/// Small set of requested symbologies
#[derive(Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "Vec<Symbology>")]
pub struct SymbologySet(u8);

impl SymbologySet {
    /// No symbology
    pub const EMPTY: SymbologySet = SymbologySet(0);
    /// Every supported symbology
    pub const ALL: SymbologySet = SymbologySet(0b111);

    /// Set holding just `symbology`
    pub fn only(symbology: Symbology) -> Self {
        SymbologySet(symbology.bit())
    }

    /// Whether `symbology` is a member
    pub fn contains(&self, symbology: Symbology) -> bool {
        self.0 & symbology.bit() != 0
    }

    /// Add `symbology`
    pub fn insert(&mut self, symbology: Symbology) {
        self.0 |= symbology.bit();
    }

    /// Members of both sets
    pub fn intersection(&self, other: SymbologySet) -> SymbologySet {
        SymbologySet(self.0 & other.0)
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Members in canonical order (EAN13, CODE128, QRCODE)
    pub fn iter(&self) -> impl Iterator<Item = Symbology> + '_ {
        Symbology::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl Default for SymbologySet {
    fn default() -> Self {
        SymbologySet::ALL
    }
}

impl FromIterator<Symbology> for SymbologySet {
    fn from_iter<I: IntoIterator<Item = Symbology>>(iter: I) -> Self {
        let mut set = SymbologySet::EMPTY;
        for s in iter {
            set.insert(s);
        }
        set
    }
}

impl From<Vec<Symbology>> for SymbologySet {
    fn from(list: Vec<Symbology>) -> Self {
        list.into_iter().collect()
    }
}

impl fmt::Debug for SymbologySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl BoundingBox {
    /// Box from its top-left corner and size
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box containing all the given points
    pub fn enclosing(points: impl IntoIterator<Item = (i64, i64)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (fx, fy) = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (fx, fy, fx, fy);
        for (x, y) in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let min_x = min_x.max(0);
        let min_y = min_y.max(0);
        Some(Self::new(
            min_x as u32,
            min_y as u32,
            (max_x - min_x).max(0) as u32 + 1,
            (max_y - min_y).max(0) as u32 + 1,
        ))
    }

    /// Undo a resize: divide every coordinate by `scale`
    pub fn unscale(&self, scale: f32) -> Self {
        if scale <= 0.0 || (scale - 1.0).abs() < f32::EPSILON {
            return *self;
        }
        Self::new(
            (self.x as f32 / scale).round() as u32,
            (self.y as f32 / scale).round() as u32,
            ((self.width as f32 / scale).round() as u32).max(1),
            ((self.height as f32 / scale).round() as u32).max(1),
        )
    }

    /// Shift by `(dx, dy)`, e.g. from a crop back to its frame
    pub fn offset(&self, dx: u32, dy: u32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Raw, unvalidated decoder output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeHit {
    /// Symbology the decoder recognised
    pub symbology: Symbology,
    /// Bytes as the decoder produced them
    pub payload: Vec<u8>,
    /// Where the symbol sits in the candidate image
    pub bounding_box: Option<BoundingBox>,
}

impl DecodeHit {
    /// Hit without a location
    pub fn new(symbology: Symbology, payload: Vec<u8>) -> Self {
        Self {
            symbology,
            payload,
            bounding_box: None,
        }
    }

    /// Attach where the symbol was found
    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }
}

/// Validated decode result, the only value handed to downstream consumers
///
/// Constructed exclusively by [`crate::validator::validate_hit`], so `value`
/// always satisfies the rules of `symbology`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Barcode {
    symbology: Symbology,
    value: String,
}

impl Barcode {
    pub(crate) fn new(symbology: Symbology, value: String) -> Self {
        Self { symbology, value }
    }

    /// Symbology of the barcode
    pub fn symbology(&self) -> Symbology {
        self.symbology
    }

    /// Decoded text
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Take the decoded text
    pub fn into_value(self) -> String {
        self.value
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.symbology, self.value)
    }
}
