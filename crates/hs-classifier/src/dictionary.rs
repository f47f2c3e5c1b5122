//! Classification dictionary.
//!
//! Placeholder tariff data: default rates are indicative and meant to be
//! replaced by a maintained data feed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Harmonized code table row.
#[derive(Debug, Clone, Copy)]
pub struct HsEntry {
    pub code: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub chapter: &'static str,
    /// Default duty rate in basis points (500 = 5%)
    pub duty_bps: u32,
}

impl HsEntry {
    pub fn default_duty_rate(&self) -> Decimal {
        Decimal::new(self.duty_bps as i64, 4)
    }

    pub fn to_info(&self) -> CodeInfo {
        CodeInfo {
            code: self.code.to_string(),
            description: self.description.to_string(),
            category: self.category.to_string(),
            chapter: self.chapter.to_string(),
            default_duty_rate: self.default_duty_rate(),
            inferred: false,
            note: None,
        }
    }
}

/// Product category with the keywords that identify it.
#[derive(Debug, Clone, Copy)]
pub struct CategoryEntry {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    /// Inclusive range of the 4-digit headings the category mainly draws from.
    pub heading_range: (&'static str, &'static str),
    pub duty_bps: u32,
}

impl CategoryEntry {
    pub fn default_duty_rate(&self) -> Decimal {
        Decimal::new(self.duty_bps as i64, 4)
    }

    /// Whether a code's heading falls inside this category's range.
    pub fn covers(&self, code: &str) -> bool {
        match code.get(..4) {
            Some(heading) => heading >= self.heading_range.0 && heading <= self.heading_range.1,
            None => false,
        }
    }
}

/// Owned view of a code table row returned by lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeInfo {
    pub code: String,
    pub description: String,
    pub category: String,
    pub chapter: String,
    pub default_duty_rate: Decimal,
    /// True when matched on the 4-digit heading rather than the full code.
    pub inferred: bool,
    pub note: Option<String>,
}

pub static CATEGORIES: &[CategoryEntry] = &[
    CategoryEntry {
        name: "electronics",
        keywords: &[
            "phone", "iphone", "smartphone", "手机", "laptop", "computer", "电脑", "tablet",
            "headphone", "耳机", "charger", "充电器", "camera", "相机",
        ],
        heading_range: ("8471", "8528"),
        duty_bps: 500,
    },
    CategoryEntry {
        name: "clothing",
        keywords: &[
            "shirt", "t-shirt", "dress", "jacket", "coat", "sweater", "jeans", "pants", "衣服",
            "t恤", "连衣裙", "外套",
        ],
        heading_range: ("6101", "6217"),
        duty_bps: 1200,
    },
    CategoryEntry {
        name: "footwear",
        keywords: &["shoes", "sneakers", "boots", "sandals", "鞋", "运动鞋", "靴"],
        heading_range: ("6401", "6405"),
        duty_bps: 800,
    },
    CategoryEntry {
        name: "bags",
        keywords: &["bag", "handbag", "backpack", "wallet", "suitcase", "背包", "钱包", "手提包"],
        heading_range: ("4202", "4202"),
        duty_bps: 600,
    },
    CategoryEntry {
        name: "cosmetics",
        keywords: &[
            "lipstick", "cream", "perfume", "makeup", "serum", "shampoo", "口红", "香水",
            "化妆品", "面霜",
        ],
        heading_range: ("3303", "3307"),
        duty_bps: 300,
    },
    CategoryEntry {
        name: "toys",
        keywords: &["toy", "doll", "puzzle", "lego", "玩具", "娃娃", "积木"],
        heading_range: ("9503", "9504"),
        duty_bps: 400,
    },
    CategoryEntry {
        name: "jewelry",
        keywords: &[
            "necklace", "bracelet", "earring", "jewelry", "pendant", "项链", "戒指", "手链",
            "耳环",
        ],
        heading_range: ("7113", "7117"),
        duty_bps: 500,
    },
    CategoryEntry {
        name: "home",
        keywords: &[
            "lamp", "pillow", "blanket", "mug", "kitchen", "towel", "台灯", "枕头", "毛巾",
            "杯子",
        ],
        heading_range: ("9401", "9405"),
        duty_bps: 400,
    },
    CategoryEntry {
        name: "books",
        keywords: &["book", "novel", "notebook", "书", "笔记本"],
        heading_range: ("4901", "4911"),
        duty_bps: 0,
    },
    CategoryEntry {
        name: "sports",
        keywords: &["yoga", "fitness", "dumbbell", "bicycle", "tennis", "瑜伽", "健身", "自行车"],
        heading_range: ("9506", "9506"),
        duty_bps: 400,
    },
];

pub static HS_CODES: &[HsEntry] = &[
    // Chapter 85 / 84: electrical machinery, computers
    HsEntry { code: "8517120000", description: "Telephones for cellular networks (mobile phones)", category: "electronics", chapter: "85", duty_bps: 0 },
    HsEntry { code: "8517130000", description: "Smartphones", category: "electronics", chapter: "85", duty_bps: 0 },
    HsEntry { code: "8471300000", description: "Portable data processing machines (laptops, tablets)", category: "electronics", chapter: "84", duty_bps: 0 },
    HsEntry { code: "8518300000", description: "Headphones and earphones", category: "electronics", chapter: "85", duty_bps: 200 },
    HsEntry { code: "8504403000", description: "Static converters (chargers, power adapters)", category: "electronics", chapter: "85", duty_bps: 0 },
    HsEntry { code: "8525890000", description: "Digital cameras and video recorders", category: "electronics", chapter: "85", duty_bps: 0 },
    // Chapters 61-62: apparel
    HsEntry { code: "6109100000", description: "T-shirts and vests of cotton, knitted", category: "clothing", chapter: "61", duty_bps: 1200 },
    HsEntry { code: "6110200000", description: "Sweaters and pullovers of cotton, knitted", category: "clothing", chapter: "61", duty_bps: 1200 },
    HsEntry { code: "6204430000", description: "Women's dresses of synthetic fibres", category: "clothing", chapter: "62", duty_bps: 1200 },
    HsEntry { code: "6201400000", description: "Men's overcoats and jackets of man-made fibres", category: "clothing", chapter: "62", duty_bps: 1200 },
    HsEntry { code: "6203420000", description: "Men's trousers and jeans of cotton", category: "clothing", chapter: "62", duty_bps: 1200 },
    // Chapter 64: footwear
    HsEntry { code: "6404110000", description: "Sports footwear with textile uppers", category: "footwear", chapter: "64", duty_bps: 1690 },
    HsEntry { code: "6403990000", description: "Footwear with leather uppers", category: "footwear", chapter: "64", duty_bps: 800 },
    // Chapter 42: leather goods, bags
    HsEntry { code: "4202210000", description: "Handbags with outer surface of leather", category: "bags", chapter: "42", duty_bps: 300 },
    HsEntry { code: "4202920000", description: "Travel bags and backpacks of textile materials", category: "bags", chapter: "42", duty_bps: 370 },
    HsEntry { code: "4202310000", description: "Wallets and purses of leather", category: "bags", chapter: "42", duty_bps: 300 },
    // Chapter 33: cosmetics
    HsEntry { code: "3304100000", description: "Lip make-up preparations", category: "cosmetics", chapter: "33", duty_bps: 0 },
    HsEntry { code: "3303000000", description: "Perfumes and toilet waters", category: "cosmetics", chapter: "33", duty_bps: 0 },
    HsEntry { code: "3304990000", description: "Skin care and beauty preparations", category: "cosmetics", chapter: "33", duty_bps: 0 },
    HsEntry { code: "3305100000", description: "Shampoos", category: "cosmetics", chapter: "33", duty_bps: 0 },
    // Chapter 95: toys, sports
    HsEntry { code: "9503000090", description: "Toys, puzzles and scale models", category: "toys", chapter: "95", duty_bps: 470 },
    HsEntry { code: "9506911000", description: "Gymnastics and fitness equipment", category: "sports", chapter: "95", duty_bps: 270 },
    HsEntry { code: "9506620000", description: "Inflatable balls", category: "sports", chapter: "95", duty_bps: 270 },
    // Chapter 71: jewellery
    HsEntry { code: "7113110000", description: "Jewellery of silver", category: "jewelry", chapter: "71", duty_bps: 250 },
    HsEntry { code: "7117190000", description: "Imitation jewellery of base metal", category: "jewelry", chapter: "71", duty_bps: 400 },
    // Household
    HsEntry { code: "9405110000", description: "Luminaires and lamps designed for LED light sources", category: "home", chapter: "94", duty_bps: 470 },
    HsEntry { code: "6302600000", description: "Toilet and kitchen linen of terry towelling", category: "home", chapter: "63", duty_bps: 1200 },
    HsEntry { code: "6912000000", description: "Ceramic tableware and kitchenware", category: "home", chapter: "69", duty_bps: 500 },
    HsEntry { code: "9404900000", description: "Pillows, cushions and similar furnishing", category: "home", chapter: "94", duty_bps: 370 },
    // Chapters 48-49: paper, books
    HsEntry { code: "4901990000", description: "Printed books and brochures", category: "books", chapter: "49", duty_bps: 0 },
    HsEntry { code: "4820100000", description: "Notebooks, diaries and memorandum pads", category: "books", chapter: "48", duty_bps: 0 },
    // Chapter 87: vehicles
    HsEntry { code: "8712000000", description: "Bicycles, not motorized", category: "sports", chapter: "87", duty_bps: 1400 },
];
