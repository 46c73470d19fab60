pub const RECIPE_PAGE_SIZE: i64 = 6;
pub const USER_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 1000;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32_000;
pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 32_000;

pub const RECIPE_NAME_LENGTH: usize = 200;
pub const RECIPE_TEXT_LENGTH: usize = 10_000;
pub const IMAGE_LENGTH: usize = 16 * 1024 * 1024;
pub const EMAIL_LENGTH: usize = 254;
pub const USER_NAME_LENGTH: usize = 150;
pub const PASSWORD_LENGTH: usize = 128;
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const MAX_BODY_BYTES: u64 = 20 * 1024 * 1024;

pub const SESSION_LIFETIME_HOURS: i64 = 24 * 7;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_cart.rtf";
pub const SHOPPING_LIST_TITLE: &str = "Shopping list";
