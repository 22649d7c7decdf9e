//! The anchor strategy chain

use super::{geometric_anchor, AnchorPoint, AnchorSource, VisionError};
use crate::classify::ContentBBox;
use crate::frame::Frame;
use log::{debug, warn};
use thiserror::Error;

/// Everything a strategy may look at for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    /// Background-removed frame in its original pixel space
    pub frame: &'a Frame,
    /// Content bounding box of `frame`
    pub bbox: ContentBBox,
}

/// Why a strategy produced no anchor for a frame.
#[derive(Debug, Error)]
pub enum StrategyMiss {
    /// The precomputed mapping has no entry for this frame
    #[error("no precomputed entry for '{0}'")]
    NotInFile(String),
    /// No pixel reaches the opacity threshold
    #[error("frame is fully transparent")]
    FullyTransparent,
    /// The vision collaborator failed or returned unusable data
    #[error("vision hint unavailable: {0}")]
    Vision(#[from] VisionError),
}

/// A way of producing an anchor point for a frame.
///
/// Strategies must not panic on bad input; anything they cannot handle is
/// reported as a [`StrategyMiss`] so the chain can fall through.
pub trait AnchorStrategy: Send + Sync {
    /// Which source this strategy reports as
    fn source(&self) -> AnchorSource;

    /// Produce an anchor in the frame's original pixel space.
    fn resolve(&self, ctx: &FrameContext<'_>) -> Result<AnchorPoint, StrategyMiss>;
}

/// Anchor chosen for a frame and the strategy that supplied it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedAnchor {
    /// Anchor in original frame space
    pub point: AnchorPoint,
    pub source: AnchorSource,
}

impl ResolvedAnchor {
    /// Anchor relative to the content crop's top-left corner.
    pub fn local(&self, bbox: &ContentBBox) -> AnchorPoint {
        self.point.to_local(bbox)
    }
}

/// Ordered list of strategies, highest priority first.
///
/// The bounding-box fallback is implicit and always last, so resolution never
/// fails for a frame that has content.
#[derive(Default)]
pub struct AnchorChain {
    strategies: Vec<Box<dyn AnchorStrategy>>,
}

impl AnchorChain {
    /// A chain with only the bounding-box fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy, keeping the list sorted by priority.
    pub fn with(mut self, strategy: Box<dyn AnchorStrategy>) -> Self {
        let rank = strategy.source().rank();
        let position = self.strategies.iter().position(|s| s.source().rank() < rank);
        match position {
            Some(index) => self.strategies.insert(index, strategy),
            None => self.strategies.push(strategy),
        }
        self
    }

    /// Sources that will be tried, in order, ending with the bbox fallback.
    pub fn sources(&self) -> Vec<AnchorSource> {
        self.strategies
            .iter()
            .map(|s| s.source())
            .chain(std::iter::once(AnchorSource::BoundingBoxGeometric))
            .collect()
    }

    /// Resolve the anchor for one frame.
    ///
    /// Each miss is logged with the frame's name and degrades to the next
    /// strategy; a failure never affects other frames.
    pub fn resolve(&self, frame: &Frame, bbox: ContentBBox) -> ResolvedAnchor {
        let ctx = FrameContext { frame, bbox };

        for strategy in &self.strategies {
            match strategy.resolve(&ctx) {
                Ok(point) => {
                    if !point.is_ordered() {
                        warn!(
                            "  {}: {} anchor out of order ({}), alignment may be off",
                            frame.name,
                            strategy.source(),
                            point
                        );
                    }
                    debug!("  {}: {} anchor {}", frame.name, strategy.source(), point);
                    return ResolvedAnchor { point, source: strategy.source() };
                }
                Err(miss) => {
                    warn!("  {}: {} anchor unavailable ({}), falling back", frame.name, strategy.source(), miss);
                }
            }
        }

        ResolvedAnchor { point: geometric_anchor(&bbox), source: AnchorSource::BoundingBoxGeometric }
    }
}

impl std::fmt::Debug for AnchorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorChain").field("sources", &self.sources()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Strategy returning a fixed answer, for exercising the ordering.
    struct Fixed {
        source: AnchorSource,
        point: Option<AnchorPoint>,
    }

    impl AnchorStrategy for Fixed {
        fn source(&self) -> AnchorSource {
            self.source
        }

        fn resolve(&self, ctx: &FrameContext<'_>) -> Result<AnchorPoint, StrategyMiss> {
            self.point.ok_or_else(|| StrategyMiss::NotInFile(ctx.frame.name.clone()))
        }
    }

    fn fixed(source: AnchorSource, point: Option<AnchorPoint>) -> Box<dyn AnchorStrategy> {
        Box::new(Fixed { source, point })
    }

    fn make_frame() -> (Frame, ContentBBox) {
        let image = RgbaImage::from_pixel(20, 20, Rgba([255, 0, 0, 255]));
        (Frame::new("frame_000.png", image), ContentBBox::new(0, 0, 20, 20).unwrap())
    }

    #[test]
    fn test_empty_chain_uses_bbox() {
        let (frame, bbox) = make_frame();
        let resolved = AnchorChain::new().resolve(&frame, bbox);
        assert_eq!(resolved.source, AnchorSource::BoundingBoxGeometric);
        assert_eq!(resolved.point, geometric_anchor(&bbox));
    }

    #[test]
    fn test_chain_orders_by_rank_regardless_of_insertion() {
        let chain = AnchorChain::new()
            .with(fixed(AnchorSource::ExternalVisionHint, None))
            .with(fixed(AnchorSource::PrecomputedFile, None))
            .with(fixed(AnchorSource::PixelCentroid, None));
        assert_eq!(
            chain.sources(),
            vec![
                AnchorSource::PrecomputedFile,
                AnchorSource::PixelCentroid,
                AnchorSource::ExternalVisionHint,
                AnchorSource::BoundingBoxGeometric,
            ]
        );
    }

    #[test]
    fn test_highest_priority_hit_wins() {
        let (frame, bbox) = make_frame();
        let from_file = AnchorPoint::new(1.0, 2.0, 3.0, 0.0);
        let from_pixels = AnchorPoint::new(9.0, 9.0, 9.0, 9.0);
        let chain = AnchorChain::new()
            .with(fixed(AnchorSource::PixelCentroid, Some(from_pixels)))
            .with(fixed(AnchorSource::PrecomputedFile, Some(from_file)));

        let resolved = chain.resolve(&frame, bbox);
        assert_eq!(resolved.source, AnchorSource::PrecomputedFile);
        assert_eq!(resolved.point, from_file);
    }

    #[test]
    fn test_miss_falls_through_to_next() {
        let (frame, bbox) = make_frame();
        let from_vision = AnchorPoint::new(4.0, 5.0, 6.0, 1.0);
        let chain = AnchorChain::new()
            .with(fixed(AnchorSource::PrecomputedFile, None))
            .with(fixed(AnchorSource::ExternalVisionHint, Some(from_vision)));

        let resolved = chain.resolve(&frame, bbox);
        assert_eq!(resolved.source, AnchorSource::ExternalVisionHint);
        assert_eq!(resolved.local(&bbox), from_vision);
    }
}
