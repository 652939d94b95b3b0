//! In-memory scene model for prisma-convert.
//!
//! This module defines the canonical representation of everything read from
//! one Level-2 product: hyperspectral cubes with per-band metadata, 2D
//! ancillary layers, geolocation arrays and the georeferencing state. It is
//! the central "hub" of the converter: the reader fills an [`L2Scene`], the
//! pipeline transforms cubes and layers, and the writers serialize them.
//!
//! # Design Principles
//!
//! 1. **Checked construction**: a cube cannot be built with a band-metadata
//!    length that disagrees with its array shape.
//!
//! 2. **Immutability after read**: pipeline stages never mutate a cube in
//!    place; they produce new cubes, so a failed stage leaves nothing half
//!    transformed.
//!
//! 3. **Explicit georeferencing state**: `Swath`, `Geographic` and
//!    `Projected` are variants of one enum, not a bag of optional fields.

mod ancillary;
mod cube;
mod georef;
mod scene;

pub use ancillary::{AncillaryLayer, SunGeometry};
pub use cube::{BandMetadata, HyperspectralCube, SpectralBand};
pub use georef::{GeoTransform, Georeferencing};
pub use scene::{Geolocation, L2Scene, ProcessingLevel, Spectrometer};
