use clap::Parser;

use crate::filter::FilterConfig;
use crate::models::{CardType, Color, Rarity, SearchQuery};

#[derive(Debug, Parser)]
#[command(
    name = "signedmtg",
    version,
    about = "Scrape tcgplayer listings for signed cards. \
             See https://github.com/Hydroflame522/SignedMTG-Scraper for documentation."
)]
pub struct Args {
    /// Search for a card by name. Quote names containing spaces.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Search for a card by color.
    #[arg(short, long, value_enum)]
    pub color: Option<Color>,

    /// Search by tcgplayer seller ID. Open the seller's feedback page and
    /// take the ID from the URL (ex. 43db324c).
    #[arg(short, long)]
    pub seller: Option<String>,

    /// Search by card type.
    #[arg(short = 't', long = "type", value_enum)]
    pub card_type: Option<CardType>,

    /// Search by rarity.
    #[arg(short, long, value_enum)]
    pub rarity: Option<Rarity>,

    /// Also match altered cards (adds "alter" to the filter words).
    #[arg(short, long)]
    pub altered: bool,

    /// Also match graded cards (adds "bgs", "cgc", "psa", "tcg", "graded").
    #[arg(short, long)]
    pub graded: bool,

    /// Extra debug logs on the command line.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn query(&self) -> SearchQuery {
        SearchQuery {
            name: self.name.clone(),
            color: self.color,
            seller: self.seller.clone(),
            card_type: self.card_type,
            rarity: self.rarity,
        }
    }

    pub fn filter(&self) -> FilterConfig {
        FilterConfig {
            include_altered: self.altered,
            include_graded: self.graded,
        }
    }
}
