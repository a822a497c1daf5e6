//! Media codec dispatch.
//!
//! Codec internals stay outside this crate: Opus and VP8 frames arrive
//! pre-compressed from the encoder collaborator and are only packetized
//! here. The G.711 companders are simple enough to carry in-tree, so PCMA
//! and PCMU also accept raw audio.

pub mod g711;

use bytes::Bytes;

use rtp::codec::vp8::{Vp8Payloader, PACKET_MAX};
use rtp::packetizer::Payloader;
use sdp::parameters::RtpCodecParameters;
use shared::error::{Error, Result};

pub const VIDEO_CLOCK_RATE: u32 = 90000;

const MAX_FRAME_RATE: u32 = 30;

const DEFAULT_BITRATE: u64 = 500_000;
const MIN_BITRATE: u64 = 250_000;
const MAX_BITRATE: u64 = 1_500_000;

/// One frame of raw, interleaved 16-bit audio.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub data: Vec<i16>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioFrame {
    /// Collapses the frame to mono by averaging channel pairs.
    fn to_mono(&self) -> Vec<i16> {
        if self.channels <= 1 {
            return self.data.clone();
        }
        self.data
            .chunks(self.channels as usize)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|s| i32::from(*s)).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    }
}

/// Negotiated codec of a sender, dispatched by payload name.
#[derive(Debug)]
pub enum Codec {
    Opus,
    Pcma,
    Pcmu,
    Vp8(Vp8State),
}

#[derive(Debug)]
pub struct Vp8State {
    payloader: Vp8Payloader,
    target_bitrate: u64,
}

impl Codec {
    /// Picks the dispatch arm for a codec descriptor, if supported.
    pub fn for_parameters(parameters: &RtpCodecParameters) -> Option<Codec> {
        match parameters.name().to_lowercase().as_str() {
            "opus" => Some(Codec::Opus),
            "pcma" => Some(Codec::Pcma),
            "pcmu" => Some(Codec::Pcmu),
            "vp8" => Some(Codec::Vp8(Vp8State {
                payloader: Vp8Payloader::new(),
                target_bitrate: DEFAULT_BITRATE,
            })),
            _ => None,
        }
    }

    /// Encodes one raw frame into RTP payloads plus the timestamp increment
    /// it covers. Only the in-tree G.711 arms accept raw audio.
    pub fn encode(&mut self, frame: &AudioFrame) -> Result<(Vec<Bytes>, u32)> {
        match self {
            Codec::Pcma => {
                let samples = frame.to_mono();
                let payload: Vec<u8> = samples.iter().map(|s| g711::linear_to_alaw(*s)).collect();
                let duration = samples.len() as u32;
                Ok((vec![Bytes::from(payload)], duration))
            }
            Codec::Pcmu => {
                let samples = frame.to_mono();
                let payload: Vec<u8> = samples.iter().map(|s| g711::linear_to_ulaw(*s)).collect();
                let duration = samples.len() as u32;
                Ok((vec![Bytes::from(payload)], duration))
            }
            Codec::Opus | Codec::Vp8(_) => Err(Error::Other(
                "raw frames for this codec need the external encoder".to_owned(),
            )),
        }
    }

    /// Packetizes one pre-compressed frame into RTP payloads plus the
    /// timestamp increment it covers.
    pub fn pack(&mut self, packet: &Bytes) -> Result<(Vec<Bytes>, u32)> {
        match self {
            // one Opus frame per packet, 20 ms at 48 kHz
            Codec::Opus => Ok((vec![packet.clone()], 960)),
            Codec::Pcma | Codec::Pcmu => Ok((vec![packet.clone()], packet.len() as u32)),
            Codec::Vp8(state) => {
                let payloads = state.payloader.payload(PACKET_MAX, packet)?;
                Ok((payloads, VIDEO_CLOCK_RATE / MAX_FRAME_RATE))
            }
        }
    }

    /// Target bitrate for codecs under rate control.
    pub fn target_bitrate(&self) -> Option<u64> {
        match self {
            Codec::Vp8(state) => Some(state.target_bitrate),
            _ => None,
        }
    }

    /// Applies a bandwidth-estimate update, clamped to the codec's usable
    /// range.
    pub fn set_target_bitrate(&mut self, bitrate: u64) {
        if let Codec::Vp8(state) = self {
            state.target_bitrate = bitrate.clamp(MIN_BITRATE, MAX_BITRATE);
        }
    }
}
