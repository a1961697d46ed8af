//! Content height measurement used by `set_height` when no fixed height is
//! given.
//!
//! The embedding environment reports three extents of the rendered content
//! (scroll, offset and client height); the plugin asks to be as tall as the
//! largest of them.

/// The three measured extents of the plugin's rendered content, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentDimensions {
    scroll_height: u32,
    offset_height: u32,
    client_height: u32,
}

impl ContentDimensions {
    /// Creates a measurement from its three extents.
    #[must_use]
    pub const fn new(scroll_height: u32, offset_height: u32, client_height: u32) -> Self {
        Self {
            scroll_height,
            offset_height,
            client_height,
        }
    }

    /// Largest of the three extents.
    ///
    /// # Example
    ///
    /// ```
    /// use plugin_bridge::measure::ContentDimensions;
    ///
    /// assert_eq!(ContentDimensions::new(120, 480, 300).max_extent(), 480);
    /// ```
    #[must_use]
    pub fn max_extent(self) -> u32 {
        self.scroll_height
            .max(self.offset_height)
            .max(self.client_height)
    }
}

/// Source of content measurements.
pub trait ContentMeasure {
    /// Measures the currently rendered content.
    fn dimensions(&self) -> ContentDimensions;
}

/// A measurement source that always reports the same dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedContent(pub ContentDimensions);

impl ContentMeasure for FixedContent {
    fn dimensions(&self) -> ContentDimensions {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::scroll_largest(ContentDimensions::new(900, 10, 20), 900)]
    #[case::offset_largest(ContentDimensions::new(10, 900, 20), 900)]
    #[case::client_largest(ContentDimensions::new(10, 20, 900), 900)]
    #[case::all_equal(ContentDimensions::new(5, 5, 5), 5)]
    #[case::empty(ContentDimensions::default(), 0)]
    fn max_extent_picks_largest(#[case] dimensions: ContentDimensions, #[case] expected: u32) {
        assert_eq!(dimensions.max_extent(), expected);
    }

    #[test]
    fn fixed_content_reports_its_dimensions() {
        let dimensions = ContentDimensions::new(1, 2, 3);
        assert_eq!(FixedContent(dimensions).dimensions(), dimensions);
    }
}
