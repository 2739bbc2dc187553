// Colour assignment for categorical groups

use plotters::style::RGBColor;

/// Ordered colour cycle for categorical groups.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<RGBColor>,
}

impl ColorPalette {
    /// d3's schemeCategory10
    pub fn category10() -> Self {
        Self {
            colors: vec![
                RGBColor(31, 119, 180),
                RGBColor(255, 127, 14),
                RGBColor(44, 160, 44),
                RGBColor(214, 39, 40),
                RGBColor(148, 103, 189),
                RGBColor(140, 86, 75),
                RGBColor(227, 119, 194),
                RGBColor(127, 127, 127),
                RGBColor(188, 189, 34),
                RGBColor(23, 190, 207),
            ],
        }
    }

    pub fn color_at(&self, index: usize) -> RGBColor {
        self.colors[index % self.colors.len()]
    }

    /// Named colour when the category is itself a colour, palette colour otherwise.
    pub fn color_for(&self, category: &str, index: usize) -> RGBColor {
        named_color(category).unwrap_or_else(|| self.color_at(index))
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::category10()
    }
}

/// RGB for the car colour names found in the sales data.
pub fn named_color(name: &str) -> Option<RGBColor> {
    let rgb = match name.to_ascii_lowercase().as_str() {
        "white" => RGBColor(236, 236, 236),
        "off-white" => RGBColor(250, 245, 230),
        "beige" => RGBColor(225, 198, 153),
        "gray" | "grey" => RGBColor(128, 128, 128),
        "silver" => RGBColor(192, 192, 192),
        "black" => RGBColor(30, 30, 30),
        "charcoal" => RGBColor(54, 69, 79),
        "red" => RGBColor(200, 30, 30),
        "burgundy" => RGBColor(128, 0, 32),
        "blue" => RGBColor(30, 80, 200),
        "turquoise" => RGBColor(64, 224, 208),
        "brown" => RGBColor(125, 80, 40),
        "purple" => RGBColor(120, 50, 160),
        "gold" => RGBColor(212, 175, 55),
        "yellow" => RGBColor(240, 210, 40),
        "green" => RGBColor(40, 150, 60),
        "lime" => RGBColor(150, 220, 50),
        "orange" => RGBColor(245, 140, 30),
        "pink" => RGBColor(240, 150, 190),
        _ => return None,
    };
    Some(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_cycles() {
        let palette = ColorPalette::category10();
        assert_eq!(palette.color_at(0), palette.color_at(10));
        assert_eq!(palette.color_at(1), RGBColor(255, 127, 14));
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(named_color("Silver"), Some(RGBColor(192, 192, 192)));
        assert_eq!(named_color("automatic"), None);
        let palette = ColorPalette::default();
        assert_eq!(palette.color_for("automatic", 2), RGBColor(44, 160, 44));
    }
}
