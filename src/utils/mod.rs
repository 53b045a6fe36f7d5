pub mod string;

pub use string::{
    bracketed_number, format_isk, format_number_with_separators, parse_price_text,
    strip_localized_markup,
};
