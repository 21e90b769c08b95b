use clap::ValueEnum;

/// Fixed entry point for the crawl: in-stock Magic singles with custom
/// (seller-described) listings, grid view.
pub const SEARCH_BASE_URL: &str = "https://www.tcgplayer.com/search/magic/product?productLineName=magic&ProductTypeName=Cards&view=grid&inStock=true&ListingType=custom";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
    Colorless,
}

impl Color {
    pub fn as_param(&self) -> &'static str {
        match self {
            Color::White => "White",
            Color::Blue => "Blue",
            Color::Black => "Black",
            Color::Red => "Red",
            Color::Green => "Green",
            Color::Colorless => "Colorless",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum CardType {
    Creature,
    Artifact,
    Legendary,
    Land,
    Instant,
    Sorcery,
    Enchantment,
    Planeswalker,
}

impl CardType {
    pub fn as_param(&self) -> &'static str {
        match self {
            CardType::Creature => "Creature",
            CardType::Artifact => "Artifact",
            CardType::Legendary => "Legendary",
            CardType::Land => "Land",
            CardType::Instant => "Instant",
            CardType::Sorcery => "Sorcery",
            CardType::Enchantment => "Enchantment",
            CardType::Planeswalker => "Planeswalker",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Mythic,
    Special,
    Token,
    Land,
    Promo,
}

impl Rarity {
    pub fn as_param(&self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Mythic => "Mythic",
            Rarity::Special => "Special",
            Rarity::Token => "Token",
            Rarity::Land => "Land",
            Rarity::Promo => "Promo",
        }
    }
}

/// Search filters selected on the command line. Fields left unset produce no
/// query parameter at all; an entirely empty query matches the whole catalog.
#[derive(Debug, Default, Clone)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub color: Option<Color>,
    pub seller: Option<String>,
    pub card_type: Option<CardType>,
    pub rarity: Option<Rarity>,
}

impl SearchQuery {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.color.is_none()
            && self.seller.is_none()
            && self.card_type.is_none()
            && self.rarity.is_none()
    }

    /// Query parameters for the set fields, in a fixed order. The site
    /// expects `+` for spaces in the name search.
    pub fn filter_string(&self) -> String {
        let mut filters = String::new();
        if let Some(name) = &self.name {
            let q = urlencoding::encode(name).replace("%20", "+");
            filters.push_str(&format!("&q={}", q));
        }
        if let Some(color) = self.color {
            filters.push_str(&format!("&Color={}", color.as_param()));
        }
        if let Some(seller) = &self.seller {
            filters.push_str(&format!("&seller={}", urlencoding::encode(seller)));
        }
        if let Some(card_type) = self.card_type {
            filters.push_str(&format!("&RequiredTypeCb={}", card_type.as_param()));
        }
        if let Some(rarity) = self.rarity {
            filters.push_str(&format!("&Rarity={}", rarity.as_param()));
        }
        filters
    }

    pub fn to_url(&self) -> String {
        format!("{}{}", SEARCH_BASE_URL, self.filter_string())
    }
}

/// One row destined for the spreadsheet. Created when a listing passes the
/// keyword filter and dedup, written once, then discarded.
#[derive(Debug, Clone)]
pub struct ListingRecord {
    pub product_page_url: String,
    pub title: String,
    pub listing_url: String,
    pub price: String,
}

/// Run-wide counters, owned by `main` and threaded through the crawlers.
#[derive(Debug, Default)]
pub struct RunStats {
    pub listings_seen: u64,
    pub rows_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_has_no_filters() {
        let query = SearchQuery::default();
        assert!(query.is_empty());
        assert_eq!(query.filter_string(), "");
        assert_eq!(query.to_url(), SEARCH_BASE_URL);
    }

    #[test]
    fn single_color_builds_single_parameter() {
        let query = SearchQuery {
            color: Some(Color::Blue),
            ..Default::default()
        };
        assert!(!query.is_empty());
        assert_eq!(query.filter_string(), "&Color=Blue");
        assert_eq!(query.to_url(), format!("{}&Color=Blue", SEARCH_BASE_URL));
    }

    #[test]
    fn name_spaces_become_plus() {
        let query = SearchQuery {
            name: Some("Lightning Bolt".to_string()),
            ..Default::default()
        };
        assert_eq!(query.filter_string(), "&q=Lightning+Bolt");
    }

    #[test]
    fn all_fields_appear_in_order() {
        let query = SearchQuery {
            name: Some("Sol Ring".to_string()),
            color: Some(Color::Colorless),
            seller: Some("43db324c".to_string()),
            card_type: Some(CardType::Artifact),
            rarity: Some(Rarity::Uncommon),
        };
        assert_eq!(
            query.filter_string(),
            "&q=Sol+Ring&Color=Colorless&seller=43db324c&RequiredTypeCb=Artifact&Rarity=Uncommon"
        );
    }
}
