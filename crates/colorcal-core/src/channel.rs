//! Color channel assignment for mosaiced sensor data.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

/// Maps a raw sensor site to the color channel it samples.
pub trait ChannelAssignment {
    fn channel_at(&self, row: usize, col: usize) -> Channel;
}

/// 2x2 color filter array layouts, named by the top-left quad in raster order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BayerPattern {
    #[default]
    Rggb,
    Bggr,
    Grbg,
    Gbrg,
}

impl BayerPattern {
    fn quad(self) -> [Channel; 4] {
        use Channel::*;
        match self {
            BayerPattern::Rggb => [Red, Green, Green, Blue],
            BayerPattern::Bggr => [Blue, Green, Green, Red],
            BayerPattern::Grbg => [Green, Red, Blue, Green],
            BayerPattern::Gbrg => [Green, Blue, Red, Green],
        }
    }
}

impl ChannelAssignment for BayerPattern {
    #[inline]
    fn channel_at(&self, row: usize, col: usize) -> Channel {
        self.quad()[(row % 2) * 2 + col % 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rggb_layout() {
        let p = BayerPattern::Rggb;
        assert_eq!(p.channel_at(0, 0), Channel::Red);
        assert_eq!(p.channel_at(0, 1), Channel::Green);
        assert_eq!(p.channel_at(1, 0), Channel::Green);
        assert_eq!(p.channel_at(1, 1), Channel::Blue);
        assert_eq!(p.channel_at(2, 3), Channel::Green);
    }

    #[test]
    fn every_quad_has_two_greens() {
        for p in [
            BayerPattern::Rggb,
            BayerPattern::Bggr,
            BayerPattern::Grbg,
            BayerPattern::Gbrg,
        ] {
            let greens = (0..2)
                .flat_map(|r| (0..2).map(move |c| (r, c)))
                .filter(|&(r, c)| p.channel_at(r, c) == Channel::Green)
                .count();
            assert_eq!(greens, 2, "{p:?}");
        }
    }
}
