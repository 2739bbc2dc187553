// Built-in chart descriptions for the bundled datasets

use crate::error::{PipelineError, Result};
use crate::pipeline::ChartPipeline;

/// A named pipeline description and the dataset it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub dataset: &'static str,
    pub description: &'static str,
    pub dsl: &'static str,
}

impl Preset {
    pub fn pipeline(&self) -> Result<ChartPipeline> {
        ChartPipeline::from_dsl(self.dsl)
    }
}

const CARS: &str = "car_prices.csv";
const CARS_SUBSET: &str = "car_prices_subset.csv";
const RISK: &str = "financial_risk_assessment.csv";
const MENTAL_HEALTH: &str = "Student_Mental_health.csv";

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "price-by-color",
        dataset: CARS_SUBSET,
        description: "Average selling price per car colour, highest first",
        dsl: r#"fields(color: text, sellingprice: number)
            | synonyms(color, gray: silver, charcoal: black, off-white: white, burgundy: red,
                       turquoise: blue, lime: green, beige: white, gold: yellow)
            | allow(color, white, black, red, silver, blue, brown, purple, yellow, green, orange, pink)
            | bar(x: color, y: mean(sellingprice), order: desc)
            | labs(title: "Average Selling Price by Car Color", x: "Color", y: "Average Selling Price")"#,
    },
    Preset {
        name: "make-body-heatmap",
        dataset: CARS_SUBSET,
        description: "Cars per make and body type for the selected colour (all colours when none)",
        dsl: r#"fields(make: text, body: text, color: text)
            | synonyms(color, gray: silver, charcoal: black, off-white: white, burgundy: red,
                       turquoise: blue, lime: green, beige: white, gold: yellow)
            | select(color)
            | heatmap(x: make, y: body)
            | labs(title: "Cars by Make and Body Type", x: "Make", y: "Body")"#,
    },
    Preset {
        name: "white-car-heatmap",
        dataset: CARS_SUBSET,
        description: "White cars per make and body type over every observed make and body",
        dsl: r#"fields(make: text, body: text, color: text)
            | where(color: white)
            | heatmap(x: make, y: body)
            | labs(title: "White Cars by Make and Body Type", x: "Make", y: "Body")"#,
    },
    Preset {
        name: "color-stream",
        dataset: CARS_SUBSET,
        description: "Cars sold per colour per model year",
        dsl: r#"fields(color: text, year: number)
            | synonyms(color, gray: silver, charcoal: black, off-white: white, burgundy: red,
                       turquoise: blue, lime: green, beige: white, gold: yellow)
            | allow(color, white, black, red, silver, blue, brown, purple, yellow, green, orange, pink)
            | stream(series: color, x: year, offset: silhouette)
            | labs(title: "Car Colors over Time", x: "Time (year)", y: "Count")"#,
    },
    Preset {
        name: "transmission-stream",
        dataset: CARS,
        description: "Manual versus automatic cars per model year",
        dsl: r#"fields(transmission: text, year: number)
            | allow(transmission, automatic, manual)
            | stream(series: transmission, x: year, offset: silhouette)
            | labs(title: "Transmission Types over Time", x: "Year", y: "Count")"#,
    },
    Preset {
        name: "price-boxplot",
        dataset: CARS,
        description: "Selling price distribution per car colour",
        dsl: r#"fields(color: text, sellingprice: number)
            | synonyms(color, gray: silver, charcoal: black, off-white: white, burgundy: red,
                       turquoise: blue, lime: green, beige: white, gold: yellow)
            | allow(color, white, black, red, silver, blue, brown, purple, yellow, green, orange, pink)
            | boxplot(x: color, y: sellingprice)
            | labs(title: "Selling Price by Color", x: "Color", y: "Selling Price")"#,
    },
    Preset {
        name: "income-histogram",
        dataset: RISK,
        description: "Income distribution per education level",
        dsl: r#"fields("Education Level": text, Income: number)
            | histogram(x: "Education Level", value: Income, bins: 20)
            | labs(title: "Income by Education Level", x: "Income", y: "Count")"#,
    },
    Preset {
        name: "price-scatter",
        dataset: CARS,
        description: "Selling price against model year",
        dsl: r#"fields(year: number, sellingprice: number)
            | scatter(x: year, y: sellingprice)
            | labs(title: "Selling Price by Year", x: "Year", y: "Selling Price")"#,
    },
    Preset {
        name: "car-parallel",
        dataset: CARS,
        description: "Transmission, condition, odometer and price per car",
        dsl: r#"fields(transmission: text, condition: number, odometer: number, sellingprice: number)
            | allow(transmission, automatic, manual)
            | parallel(dims: [transmission, condition, odometer, sellingprice], color: transmission)
            | labs(title: "Car Attributes")"#,
    },
    Preset {
        name: "mental-health-parallel",
        dataset: MENTAL_HEALTH,
        description: "Depression, anxiety, panic attacks and treatment by CGPA band",
        dsl: r#"fields("Do you have Depression?": text, "Do you have Anxiety?": text,
                   "Do you have Panic attack?": text,
                   "Did you seek any specialist for a treatment?": text, "What is your CGPA?": text)
            | parallel(dims: ["Do you have Depression?", "Do you have Anxiety?", "Do you have Panic attack?",
                              "Did you seek any specialist for a treatment?", "What is your CGPA?"],
                       color: "What is your CGPA?")
            | labs(title: "Student Mental Health")"#,
    },
    Preset {
        name: "color-make-sankey",
        dataset: CARS_SUBSET,
        description: "Flow of cars from colour to make",
        dsl: r#"fields(color: text, make: text)
            | synonyms(color, gray: silver, charcoal: black, off-white: white, burgundy: red,
                       turquoise: blue, lime: green, beige: white, gold: yellow)
            | allow(color, white, black, red, silver, blue, brown, purple, yellow, green, orange, pink)
            | sankey(from: color, to: make)
            | labs(title: "Car Colors to Makes")"#,
    },
];

pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Look up a preset and compile it.
pub fn pipeline(name: &str) -> Result<ChartPipeline> {
    find(name)
        .ok_or_else(|| PipelineError::Config(format!("unknown preset '{}'", name)))?
        .pipeline()
}
