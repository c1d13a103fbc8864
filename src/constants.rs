pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 6;

pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MAX_INGREDIENT_AMOUNT: i32 = 32_000;
pub const MIN_COOKING_TIME: i32 = 1;

pub const NAME_MAX_LENGTH: usize = 256;
pub const TAG_NAME_MAX_LENGTH: usize = 32;
pub const TAG_SLUG_MAX_LENGTH: usize = 32;
pub const INGREDIENT_NAME_MAX_LENGTH: usize = 128;
pub const INGREDIENT_MEASUREMENT_MAX_LENGTH: usize = 64;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;

pub const FORBIDDEN_USERNAMES: &[&str] = &["me"];

pub const SHOPPING_LIST_HEADER: &str = "Shopping List:";

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_LIFETIME_HOURS: i64 = 1;
