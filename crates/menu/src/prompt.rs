use pantry_core::{InventoryItem, ISO_DATE_FORMAT};
use serde::{Deserialize, Serialize};

/// Shown in place of a menu when generation fails.
pub const GENERATION_FAILED_TEXT: &str = "献立の生成に失敗しました。";

/// Recipe sites the model is asked to draw on and link to.
pub const REFERENCE_SITES: [&str; 2] = [
    "https://panasonic.jp/cooking/recipe/autocooker.html",
    "https://cookpad.com/jp",
];

const UNSPECIFIED: &str = "指定なし";
const NONE: &str = "なし";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Course {
    #[serde(rename = "主菜")]
    Main,
    #[serde(rename = "副菜")]
    Side,
    #[serde(rename = "汁物")]
    Soup,
    #[serde(rename = "デザート")]
    Dessert,
}

impl Course {
    pub const ALL: [Course; 4] = [Course::Main, Course::Side, Course::Soup, Course::Dessert];

    pub fn label(self) -> &'static str {
        match self {
            Course::Main => "主菜",
            Course::Side => "副菜",
            Course::Soup => "汁物",
            Course::Dessert => "デザート",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Servings {
    #[serde(rename = "1人前")]
    One,
    #[serde(rename = "2人前")]
    Two,
    #[serde(rename = "3人前")]
    Three,
    #[serde(rename = "4人前")]
    Four,
}

impl Servings {
    pub const ALL: [Servings; 4] = [Servings::One, Servings::Two, Servings::Three, Servings::Four];

    pub fn label(self) -> &'static str {
        match self {
            Servings::One => "1人前",
            Servings::Two => "2人前",
            Servings::Three => "3人前",
            Servings::Four => "4人前",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cuisine {
    #[serde(rename = "和食")]
    Japanese,
    #[serde(rename = "洋食")]
    Western,
    #[serde(rename = "中華")]
    Chinese,
    #[serde(rename = "イタリアン")]
    Italian,
    #[serde(rename = "その他")]
    Other,
}

impl Cuisine {
    pub const ALL: [Cuisine; 5] = [
        Cuisine::Japanese,
        Cuisine::Western,
        Cuisine::Chinese,
        Cuisine::Italian,
        Cuisine::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Cuisine::Japanese => "和食",
            Cuisine::Western => "洋食",
            Cuisine::Chinese => "中華",
            Cuisine::Italian => "イタリアン",
            Cuisine::Other => "その他",
        }
    }
}

/// The user's choices for one menu suggestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuRequest {
    /// Falls back to the configured default model when absent.
    pub model: Option<String>,
    pub courses: Vec<Course>,
    pub servings: Option<Servings>,
    pub cuisine: Option<Cuisine>,
    pub conditions: Option<String>,
}

/// Everything a client needs to render the menu form.
#[derive(Debug, Clone, Serialize)]
pub struct MenuOptions {
    pub models: Vec<String>,
    pub default_model: Option<String>,
    pub courses: Vec<Course>,
    pub servings: Vec<Servings>,
    pub cuisines: Vec<Cuisine>,
}

impl MenuOptions {
    pub fn new(models: Vec<String>, default_model: Option<String>) -> Self {
        Self {
            models,
            default_model,
            courses: Course::ALL.to_vec(),
            servings: Servings::ALL.to_vec(),
            cuisines: Cuisine::ALL.to_vec(),
        }
    }
}

fn ingredient_line(item: &InventoryItem) -> String {
    format!(
        "{} (期限: {}, 数量: {})",
        item.name,
        item.expiry_date.format(ISO_DATE_FORMAT),
        item.quantity
    )
}

/// Render the menu prompt for `request` over the current inventory.
pub fn build_prompt(request: &MenuRequest, items: &[InventoryItem]) -> String {
    let courses = request
        .courses
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join("・");
    let servings = request.servings.map_or(UNSPECIFIED, Servings::label);
    let cuisine = request.cuisine.map_or(UNSPECIFIED, Cuisine::label);
    let conditions = request
        .conditions
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(NONE);
    let ingredients = items.iter().map(ingredient_line).collect::<Vec<_>>().join(", ");

    format!(
        "以下の食材・分量・好み・その他条件を使用して、{courses}献立を提案してください。\n\
         提案は具体的なレシピ名、使用する食材、簡単な調理手順を含めてください。\n\
         食材リストにない食材は使用しないでください。使用する場合は最後に何を買うべきか提案してください。\n\
         献立検討時には以下リンクの情報を参考にして、提案する際には具体的なURLを添付してください。\n\
         {site_a}\n\
         {site_b}\n\
         期限が近い食材を優先的に使用してください。\n\
         分量: {servings}\n\
         好み: {cuisine}\n\
         その他条件: {conditions}\n\
         \n\
         食材リスト:\n\
         {ingredients}\n\
         \n\
         提案例:\n\
         レシピ名: 鶏肉と野菜の炒め物\n\
         使用食材: 鶏もも肉、玉ねぎ、ピーマン、にんじん\n\
         調理手順: 1. 鶏肉と野菜を切る。2. フライパンで炒める。3. 塩コショウで味を調える。\n",
        site_a = REFERENCE_SITES[0],
        site_b = REFERENCE_SITES[1],
    )
}
