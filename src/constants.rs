pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_RECIPES_LIMIT: i64 = 3;

pub const INT_MIN_VALUE: i32 = 1;
pub const INT_MAX_VALUE: i32 = 32000;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SESSION_HOURS: i64 = 24;
pub const DEFAULT_MEDIA_ROOT: &str = "./media";
pub const DEFAULT_MEDIA_URL: &str = "/media/";
pub const DEVELOPMENT_SECRET: &str = "foodgram-development-secret";

pub const RECIPE_IMAGE_DIR: &str = "recipes/images";
pub const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

pub const SHOPPING_LIST_SUFFIX: &str = "shopping_list";

pub const TOKEN_PREFIXES: &[&str] = &["Token ", "Bearer "];
