// src/leaves/pleaf.rs

//! Pressure leaf: one leveled pressure channel and three temperatures.

use super::readings::ReadingsBuffer;
use super::units::{Conversion, Temperature};
use super::Node;
use crate::common::{address::XerxesAddr, error::XerxesError};
use crate::network::Channel;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Fetch command understood by pressure leaves. Device specific, not a
/// registry message id.
pub const PLEAF_FETCH_COMMAND: [u8; 1] = [0x00];
/// Reply body: four big-endian `u32` register words.
pub const PLEAF_PAYLOAD_LEN: usize = 16;

/// One decoded pressure leaf measurement.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PLeafData {
    pub address: XerxesAddr,
    /// Leveled pressure as produced by the leaf's conversion strategy.
    pub nivelation: f64,
    pub temperature_sensor: Temperature,
    pub temperature_external_1: Temperature,
    pub temperature_external_2: Temperature,
}

impl PLeafData {
    /// Usable for averaging: every field is a finite number.
    pub fn is_valid(&self) -> bool {
        self.nivelation.is_finite()
            && self.temperature_sensor.is_finite()
            && self.temperature_external_1.is_finite()
            && self.temperature_external_2.is_finite()
    }
}

/// Mean of a batch of readings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AveragePLeafData {
    pub nivelation: f64,
    pub temperature_sensor: Temperature,
    pub temperature_external_1: Temperature,
    pub temperature_external_2: Temperature,
    /// Readings left out of the mean.
    pub invalid: usize,
}

/// Flat record handed to the uploader.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PLeafSummary {
    pub nivelation_raw: f64,
    /// `nivelation_raw` re-based against the reference leaf.
    pub nivelation: f64,
    pub temp_sens: f64,
    pub temp_ext1: f64,
    pub temp_ext2: f64,
    pub errors: usize,
}

pub struct PLeaf {
    address: XerxesAddr,
    medium: Arc<dyn Conversion>,
    readings: ReadingsBuffer<PLeafData>,
}

impl fmt::Debug for PLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PLeaf")
            .field("address", &self.address)
            .field("readings", &self.readings.len())
            .finish_non_exhaustive()
    }
}

impl PLeaf {
    pub fn new<M: Conversion + 'static>(address: XerxesAddr, medium: M) -> Self {
        Self::with_shared(address, Arc::new(medium))
    }

    /// Builds a leaf around a strategy shared with other leaves.
    pub fn with_shared(address: XerxesAddr, medium: Arc<dyn Conversion>) -> Self {
        PLeaf { address, medium, readings: ReadingsBuffer::unbounded() }
    }

    pub fn with_buffer(mut self, readings: ReadingsBuffer<PLeafData>) -> Self {
        self.readings = readings;
        self
    }

    /// One leaf per address, all using the same strategy.
    pub fn from_addresses<I>(addresses: I, medium: Arc<dyn Conversion>) -> Vec<PLeaf>
    where
        I: IntoIterator<Item = XerxesAddr>,
    {
        addresses
            .into_iter()
            .map(|address| PLeaf::with_shared(address, Arc::clone(&medium)))
            .collect()
    }

    pub fn address(&self) -> XerxesAddr {
        self.address
    }

    /// Fetches, decodes and buffers one measurement, returning a copy.
    pub fn read<C: Channel>(&self, channel: &mut C) -> Result<PLeafData, XerxesError<C::Error>> {
        let reply = channel.exchange(self.address, &PLEAF_FETCH_COMMAND)?;
        let data = self.decode(reply.payload()).map_err(XerxesError::widen)?;
        self.readings.push(data.clone()).map_err(XerxesError::widen)?;
        Ok(data)
    }

    /// Decodes a reply body. Anything but exactly 16 bytes is rejected.
    pub fn decode(&self, payload: &[u8]) -> Result<PLeafData, XerxesError> {
        if payload.len() != PLEAF_PAYLOAD_LEN {
            return Err(XerxesError::DecodeShape { expected: PLEAF_PAYLOAD_LEN, got: payload.len() });
        }
        let mut words = payload
            .chunks_exact(4)
            .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]));
        let mut next = || words.next().unwrap_or_default();

        Ok(PLeafData {
            address: self.address,
            nivelation: self.medium.convert(next()),
            temperature_sensor: Temperature::from_milli_kelvin(next()),
            temperature_external_1: Temperature::from_milli_kelvin(next()),
            temperature_external_2: Temperature::from_milli_kelvin(next()),
        })
    }

    pub fn pop(&self) -> Result<PLeafData, XerxesError> {
        self.readings.pop()
    }

    pub fn pop_all(&self) -> Vec<PLeafData> {
        self.readings.pop_all()
    }

    pub fn readings(&self) -> &ReadingsBuffer<PLeafData> {
        &self.readings
    }

    /// Field-wise mean over the valid readings of a batch.
    ///
    /// Values are ordered before accumulating, so the result does not depend
    /// on the order of `readings`.
    pub fn average(readings: &[PLeafData]) -> Result<AveragePLeafData, XerxesError> {
        if readings.is_empty() {
            return Err(XerxesError::EmptyInput);
        }

        let (valid, invalid): (Vec<&PLeafData>, Vec<&PLeafData>) =
            readings.iter().partition(|r| r.is_valid());
        if valid.is_empty() {
            return Err(XerxesError::AllInvalid);
        }

        let field = |get: fn(&PLeafData) -> f64| mean(valid.iter().map(|r| get(*r)).collect());

        Ok(AveragePLeafData {
            nivelation: field(|r| r.nivelation),
            temperature_sensor: Temperature::from_kelvin(field(|r| r.temperature_sensor.kelvin())),
            temperature_external_1: Temperature::from_kelvin(field(|r| r.temperature_external_1.kelvin())),
            temperature_external_2: Temperature::from_kelvin(field(|r| r.temperature_external_2.kelvin())),
            invalid: invalid.len(),
        })
    }

    /// Flattens an average, re-basing the nivelation by `reference_offset`.
    pub fn to_summary(average: Option<&AveragePLeafData>, reference_offset: f64) -> Option<PLeafSummary> {
        let average = average?;
        Some(PLeafSummary {
            nivelation_raw: average.nivelation,
            nivelation: average.nivelation - reference_offset,
            temp_sens: average.temperature_sensor.preferred(),
            temp_ext1: average.temperature_external_1.preferred(),
            temp_ext2: average.temperature_external_2.preferred(),
            errors: average.invalid,
        })
    }

    /// Summarizes every leaf, zeroed against the nivelation of `reference`.
    pub fn summarize(
        averages: &BTreeMap<XerxesAddr, AveragePLeafData>,
        reference: XerxesAddr,
    ) -> Result<BTreeMap<XerxesAddr, PLeafSummary>, XerxesError> {
        let offset = averages
            .get(&reference)
            .map(|avg| avg.nivelation)
            .ok_or(XerxesError::UnknownAddress(reference))?;

        Ok(averages
            .iter()
            .filter_map(|(address, avg)| Some((*address, Self::to_summary(Some(avg), offset)?)))
            .collect())
    }
}

impl<C: Channel> Node<C> for PLeaf {
    fn address(&self) -> XerxesAddr {
        self.address
    }

    fn fetch(&self, channel: &mut C) -> Result<(), XerxesError<C::Error>> {
        self.read(channel).map(|_| ())
    }
}

/// Mean of a set of values, exact when all values are equal.
///
/// Both terms of each step are scaled down before subtracting, so finite
/// inputs of any magnitude give a finite mean.
fn mean(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.iter().enumerate().fold(0.0, |mean, (i, x)| {
        let k = (i + 1) as f64;
        mean + (x / k - mean / k)
    })
}
