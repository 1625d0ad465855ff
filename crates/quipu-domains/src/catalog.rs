//! Embedded catalogs backing the sales domain. Fixed at compile time; the
//! same seed always picks the same entries.

pub const FIRST_NAMES: &[&str] = &[
    "Juan", "Maria", "Jose", "Ana", "Luis", "Carmen", "Carlos", "Rosa", "Jorge", "Julia",
    "Pedro", "Sofia", "Miguel", "Lucia", "Victor", "Elena", "Raul", "Patricia", "Hugo", "Diana",
    "Oscar", "Teresa", "Felipe", "Gabriela",
];

pub const LAST_NAMES: &[&str] = &[
    "Quispe", "Garcia", "Rodriguez", "Flores", "Sanchez", "Huaman", "Diaz", "Torres", "Ramos",
    "Vargas", "Castillo", "Rojas", "Mamani", "Chavez", "Gutierrez", "Mendoza", "Paredes",
    "Delgado", "Salazar", "Espinoza",
];

pub const CITIES: &[&str] = &[
    "Lima", "Arequipa", "Trujillo", "Cusco", "Chiclayo", "Piura", "Iquitos", "Huancayo",
    "Tacna", "Puno", "Ica", "Cajamarca",
];

pub const EMAIL_DOMAINS: &[&str] = &["gmail.com", "hotmail.com", "yahoo.es", "outlook.com"];

pub const PAYMENT_METHODS: &[&str] =
    &["Credit Card", "Debit Card", "PayPal", "Bank Transfer", "Cash"];

pub const SEASONAL_TAGS: &[&str] = &["summer", "winter", "all_year"];

/// Product vocabulary for one category. `price_factor` scales the base
/// price draw so groceries stay cheap and electronics expensive.
pub struct CategorySpec {
    pub name: &'static str,
    pub brands: &'static [&'static str],
    pub adjectives: &'static [&'static str],
    pub nouns: &'static [&'static str],
    pub price_factor: f64,
}

pub const CATEGORIES: &[CategorySpec] = &[
    CategorySpec {
        name: "Electronics",
        brands: &["Voltix", "Nanotek", "Andina", "Corelight"],
        adjectives: &["Smart", "Compact", "Pro", "Ultra"],
        nouns: &["Speaker", "Headphones", "Charger", "Monitor", "Tablet"],
        price_factor: 3.0,
    },
    CategorySpec {
        name: "Clothing",
        brands: &["Alpaca Sur", "Kantu", "Wayra", "Monte"],
        adjectives: &["Classic", "Slim", "Thermal", "Urban"],
        nouns: &["Jacket", "Sweater", "Shirt", "Scarf", "Poncho"],
        price_factor: 1.2,
    },
    CategorySpec {
        name: "Home",
        brands: &["Casaviva", "Hogarix", "Nido", "Selva"],
        adjectives: &["Wooden", "Ceramic", "Folding", "Woven"],
        nouns: &["Lamp", "Chair", "Blanket", "Shelf", "Pot"],
        price_factor: 1.5,
    },
    CategorySpec {
        name: "Grocery",
        brands: &["Inka Foods", "Del Valle", "Qori", "Pacha"],
        adjectives: &["Organic", "Roasted", "Dried", "Fresh"],
        nouns: &["Coffee", "Quinoa", "Chocolate", "Honey", "Tea"],
        price_factor: 0.4,
    },
    CategorySpec {
        name: "Toys",
        brands: &["Pukllay", "Trompo", "Lumo", "Sol"],
        adjectives: &["Wooden", "Magnetic", "Mini", "Giant"],
        nouns: &["Puzzle", "Blocks", "Kite", "Robot", "Ball"],
        price_factor: 0.8,
    },
];
