//! Element locators for tcgplayer.com.
//!
//! The site's markup structure is an external contract that changes on its
//! own schedule. Every locator the crawlers depend on lives here so a layout
//! change touches exactly one file.

/// Results container on a search page.
pub const SEARCH_RESULTS: &str = "div.search-result";

/// Product detail links inside the results container.
pub const PRODUCT_LINKS: &str = "div.search-result a[href*='/product/']";

/// One seller listing section on a product page.
pub const LISTING_SECTION: &str = "section.listing-item";

/// Listing title text, nested inside the listing data block.
pub const LISTING_TITLE: &str = "div.listing-item__listing-data__listo__title > div";

/// "See more" anchor carrying the listing URL.
pub const LISTING_LINK: &str = "a.listing-item__listing-data__listo__see-more";

/// Listing price display text.
pub const LISTING_PRICE: &str = "div.listing-item__listing-data__info__price";

/// Next-page control, shared by search and listing pagination. A disabled
/// marker in its class attribute means the current page is the last one.
pub const NEXT_PAGE: &str = "a[aria-label='Next page']";
