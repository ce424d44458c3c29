//! Block-wise stereo level metering of an input stream

use crate::audio::{Levels, SampleBuffer};
use crate::error::{Result, SoxError};
use crate::sox::InputStream;

/// Levels of one block of samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockLevels {
    pub index: usize,
    /// Interleaved samples in the block; the last block may be short
    pub samples: usize,
    pub levels: Levels,
}

/// Reads an input in fixed-size blocks and reports the peak levels of each.
///
/// Samples are split by index parity, so stereo input gives left/right
/// levels and mono input alternates between the two.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    block_size: usize,
}

impl LevelMeter {
    pub fn new(block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(SoxError::invalid_argument("Block size must be greater than 0"));
        }
        Ok(Self { block_size })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Meter the rest of `input`, calling `on_block` per block.
    /// Returns the number of blocks read.
    pub fn for_each_block<F>(&self, input: &mut InputStream<'_>, mut on_block: F) -> usize
    where
        F: FnMut(BlockLevels),
    {
        let mut buffer = SampleBuffer::new(self.block_size);
        let mut index = 0;

        loop {
            let read = input.read_into(&mut buffer);
            if read == 0 {
                break;
            }
            on_block(BlockLevels {
                index,
                samples: read,
                levels: buffer.peak_levels(self.block_size),
            });
            index += 1;
        }

        log::debug!("Metered {} block(s) of {} from {}", index, self.block_size, input.label());
        index
    }

    /// Meter the rest of `input`, collecting every block
    pub fn measure(&self, input: &mut InputStream<'_>) -> Vec<BlockLevels> {
        let mut blocks = Vec::new();
        self.for_each_block(input, |block| blocks.push(block));
        blocks
    }

    /// Loudest peak over a set of blocks, as one level pair.
    /// Lower needle values are louder.
    pub fn overall(blocks: &[BlockLevels]) -> Levels {
        blocks
            .iter()
            .map(|b| b.levels)
            .reduce(|a, b| Levels {
                left: a.left.min(b.left),
                right: a.right.min(b.right),
            })
            .unwrap_or_else(|| Levels::from_peaks(0.0, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(index: usize, left: f64, right: f64) -> BlockLevels {
        BlockLevels {
            index,
            samples: 4,
            levels: Levels::from_peaks(left, right),
        }
    }

    #[test]
    fn test_zero_block_size_rejected() {
        assert!(LevelMeter::new(0).is_err());
        assert_eq!(LevelMeter::new(512).unwrap().block_size(), 512);
    }

    #[test]
    fn test_overall_takes_loudest_block_per_side() {
        let blocks = vec![block(0, 0.5, 0.1), block(1, 0.2, 0.9)];
        let overall = LevelMeter::overall(&blocks);
        assert_eq!(overall, Levels::from_peaks(0.5, 0.9));
    }

    #[test]
    fn test_overall_of_nothing_is_silent() {
        let silent = LevelMeter::overall(&[]);
        assert_eq!(silent.left, Levels::SILENT);
        assert_eq!(silent.right, Levels::SILENT);
    }
}
