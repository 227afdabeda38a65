//! online.metro-cc.ru site profile

use crate::traits::{SiteConfig, SiteSelectors};

/// Lower-cased label of the brand row on detail pages.
pub const BRAND_LABEL: &str = "бренд";

/// Cookie carrying the selected store.
pub const STORE_COOKIE: &str = "metroStoreId";

/// Headers sent with every request, copied from a desktop Edge session.
pub const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("accept-language", "ru,en;q=0.9,en-GB;q=0.8,en-US;q=0.7"),
    ("cache-control", "max-age=0"),
    ("dnt", "1"),
    ("referer", "https://online.metro-cc.ru/"),
    (
        "sec-ch-ua",
        "\"Microsoft Edge\";v=\"117\", \"Not;A=Brand\";v=\"8\", \"Chromium\";v=\"117\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "same-origin"),
    ("sec-fetch-user", "?1"),
    ("upgrade-insecure-requests", "1"),
];

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36 Edg/117.0.2045.60";

/// Cookies sent with every request besides the store id.
pub const BASE_COOKIES: &[(&str, &str)] = &[
    ("is18Confirmed", "true"),
    ("_ym_isad", "2"),
    ("_ym_visorc", "w"),
];

/// Selectors and labels for Metro's catalog markup.
#[must_use]
pub fn site_config() -> SiteConfig {
    SiteConfig {
        name: "Metro".to_string(),
        selectors: SiteSelectors {
            product_card: "div[data-sku]".to_string(),
            title: ".product-card-name__text".to_string(),
            actual_price:
                ".product-card-prices__content .product-card-prices__actual .product-price__sum"
                    .to_string(),
            old_price:
                ".product-card-prices__content .product-card-prices__old .product-price__sum"
                    .to_string(),
            link: "a".to_string(),
            pagination_container: "ul.catalog-paginate.v-pagination".to_string(),
            pagination_item: "li".to_string(),
            attributes_list: ".product-attributes__list.style--product-page-full-list"
                .to_string(),
            attribute_item: ".product-attributes__list-item".to_string(),
            address: ".header-address__receive-address".to_string(),
        },
        sku_attribute: "data-sku".to_string(),
        brand_label: BRAND_LABEL.to_string(),
        attribute_separator: "   ".to_string(),
        output_suffix: "onlineMetroRu".to_string(),
    }
}
