//! Sample record: a product keyed by its integer id.

use crate::common::{Error, Result};
use crate::index::Key;

use super::RecordCodec;

/// A product row.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i32,
    /// At most [`ProductCodec::NAME_WIDTH`] bytes are kept.
    pub name: String,
    pub price: f32,
}

impl Product {
    pub fn new(id: i32, name: impl Into<String>, price: f32) -> Self {
        Self {
            id,
            name: name.into(),
            price,
        }
    }
}

/// Packed little-endian layout: `id i32 | name [u8; 30] | price f32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductCodec;

impl ProductCodec {
    pub const NAME_WIDTH: usize = 30;
    pub const SIZE: usize = 4 + Self::NAME_WIDTH + 4;

    const OFFSET_NAME: usize = 4;
    const OFFSET_PRICE: usize = 4 + Self::NAME_WIDTH;
}

impl RecordCodec for ProductCodec {
    type Record = Product;

    fn record_size(&self) -> usize {
        Self::SIZE
    }

    fn encode(&self, record: &Product, out: &mut [u8]) -> Result<()> {
        if out.len() != Self::SIZE {
            return Err(Error::Format(format!(
                "product buffer is {} bytes, expected {}",
                out.len(),
                Self::SIZE
            )));
        }
        let mut name_len = record.name.len().min(Self::NAME_WIDTH);
        while !record.name.is_char_boundary(name_len) {
            name_len -= 1;
        }

        out.fill(0);
        out[..4].copy_from_slice(&record.id.to_le_bytes());
        out[Self::OFFSET_NAME..Self::OFFSET_NAME + name_len]
            .copy_from_slice(&record.name.as_bytes()[..name_len]);
        out[Self::OFFSET_PRICE..].copy_from_slice(&record.price.to_le_bytes());
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Product> {
        if bytes.len() != Self::SIZE {
            return Err(Error::Format(format!(
                "product is {} bytes, expected {}",
                bytes.len(),
                Self::SIZE
            )));
        }
        let mut word = [0u8; 4];
        word.copy_from_slice(&bytes[..4]);
        let id = i32::from_le_bytes(word);

        let name_bytes = &bytes[Self::OFFSET_NAME..Self::OFFSET_PRICE];
        let end = name_bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let name = std::str::from_utf8(&name_bytes[..end])
            .map_err(|e| Error::Format(format!("product name is not UTF-8: {}", e)))?
            .to_string();

        word.copy_from_slice(&bytes[Self::OFFSET_PRICE..]);
        let price = f32::from_le_bytes(word);

        Ok(Product { id, name, price })
    }

    fn key(&self, record: &Product) -> Key {
        Key::Int(record.id)
    }
}
