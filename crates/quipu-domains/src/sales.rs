use std::ops::Range;

use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

use quipu_core::{
    ColumnKind, ColumnSpec, DatePair, Error, ForeignKeyTarget, IdSpace, Row, TableSpec,
    TableVolume, Value,
};
use quipu_engine::{DaySchedule, DomainHandler, EngineError, SeedDerivation};

use crate::catalog::{
    CATEGORIES, CITIES, EMAIL_DOMAINS, FIRST_NAMES, LAST_NAMES, PAYMENT_METHODS, SEASONAL_TAGS,
    CategorySpec,
};

const DOMAIN: &str = "sales";
const TWO_PI: f64 = std::f64::consts::TAU;
/// Day of year where the seasonal product intensity peaks (southern-
/// hemisphere summer).
const SEASON_PEAK_DOY: f64 = 45.0;

/// Sizing knobs for the sales domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesParams {
    pub customers: u64,
    pub products: u64,
    /// Fraction of customers treated as high-frequency buyers.
    pub vip_share: f64,
    /// Fraction of orders landing on that VIP segment (Pareto 80/20).
    pub vip_order_share: f64,
}

impl Default for SalesParams {
    fn default() -> Self {
        Self {
            customers: 10_000,
            products: 500,
            vip_share: 0.2,
            vip_order_share: 0.8,
        }
    }
}

/// Sales domain: customer and product dimensions plus order and payment
/// facts. Every attribute is a pure function of the global row index, so a
/// range materializes identically no matter how the run was batched.
pub struct SalesDomain {
    params: SalesParams,
    seeds: SeedDerivation,
    tables: Vec<TableSpec>,
}

impl SalesDomain {
    pub fn new(params: SalesParams, global_seed: u64) -> Self {
        let params = SalesParams {
            customers: params.customers.max(1),
            products: params.products.max(3),
            ..params
        };
        let tables = build_tables(&params);
        Self {
            params,
            seeds: SeedDerivation::new(global_seed),
            tables,
        }
    }

    fn customer_row(&self, index: u64) -> Row {
        let first = pick(&self.seeds, "customers", "first-name", index, FIRST_NAMES);
        let last = pick(&self.seeds, "customers", "last-name", index, LAST_NAMES);
        let email_domain = pick(&self.seeds, "customers", "email-domain", index, EMAIL_DOMAINS);
        let city = pick(&self.seeds, "customers", "city", index, CITIES);

        let mut rng = self.seeds.stream(DOMAIN, "customers", "phone", index);
        let phone = format!("9{:08}", rng.random_range(0..100_000_000_u64));
        let email = format!("{}.{}@{}", first.to_lowercase(), last.to_lowercase(), email_domain);

        vec![
            Value::Int(index as i64),
            Value::Text(first.to_string()),
            Value::Text(last.to_string()),
            Value::Text(email),
            Value::Text(phone),
            Value::Text(city.to_string()),
        ]
    }

    fn product_category(&self, index: u64) -> &'static CategorySpec {
        let mut rng = self.seeds.stream(DOMAIN, "products", "category", index);
        &CATEGORIES[rng.random_range(0..CATEGORIES.len())]
    }

    fn product_name(&self, index: u64) -> String {
        let category = self.product_category(index);
        let mut rng = self.seeds.stream(DOMAIN, "products", "name", index);
        let brand = category.brands[rng.random_range(0..category.brands.len())];
        let adjective = category.adjectives[rng.random_range(0..category.adjectives.len())];
        let noun = category.nouns[rng.random_range(0..category.nouns.len())];
        format!("{brand} {adjective} {noun}")
    }

    fn product_base_price(&self, index: u64) -> f64 {
        let category = self.product_category(index);
        let mut rng = self.seeds.stream(DOMAIN, "products", "base-price", index);
        round2((rng.random::<f64>() * 100.0 + 10.0) * category.price_factor)
    }

    fn product_row(&self, index: u64) -> Row {
        let category = self.product_category(index);
        let tag = SEASONAL_TAGS[(index % 3) as usize];
        vec![
            Value::Int(index as i64),
            Value::Text(self.product_name(index)),
            Value::Text(category.name.to_string()),
            Value::Text(tag.to_string()),
            Value::Float(self.product_base_price(index)),
        ]
    }

    fn pick_customer(&self, index: u64) -> u64 {
        let customers = self.params.customers;
        let vip_count = ((customers as f64 * self.params.vip_share) as u64).clamp(1, customers);
        let casual_count = customers - vip_count;

        let mut rng = self.seeds.stream(DOMAIN, "orders", "customer", index);
        let roll: f64 = rng.random();
        if casual_count == 0 || roll < self.params.vip_order_share {
            rng.random_range(0..vip_count)
        } else {
            vip_count + rng.random_range(0..casual_count)
        }
    }

    /// Seasonal intensity in [0, 1]: summer products dominate near the
    /// seasonal peak, winter products near the trough.
    fn pick_product(&self, index: u64, date: NaiveDate) -> u64 {
        let mut rng = self.seeds.stream(DOMAIN, "orders", "product", index);
        let noise = rng.random::<f64>() * 0.2 - 0.1;
        let phase = (date.ordinal() as f64 - SEASON_PEAK_DOY) / 365.25;
        let intensity = (((TWO_PI * phase).cos() + 1.0) / 2.0 + noise).clamp(0.0, 1.0);

        let mut p_summer = 0.05 + 0.65 * intensity;
        let p_winter = 0.05 + 0.55 * (1.0 - intensity);
        if date.weekday().num_days_from_monday() >= 5 {
            p_summer = (p_summer * 1.2).min(1.0);
        }

        let roll: f64 = rng.random();
        let tag = if roll < p_summer {
            0 // summer
        } else if roll < p_summer + p_winter {
            1 // winter
        } else {
            2 // all_year
        };

        // Product ids cycle through the seasonal tags, so each bucket is an
        // arithmetic progression.
        let products = self.params.products;
        let bucket_len = (products + 2 - tag) / 3;
        if bucket_len == 0 {
            return rng.random_range(0..products);
        }
        3 * rng.random_range(0..bucket_len) + tag
    }

    fn order_parts(&self, index: u64, schedule: &DaySchedule) -> Result<OrderParts, EngineError> {
        let day = schedule.day_for_index(index).ok_or_else(|| {
            Error::Internal(format!("row index {index} outside the day schedule"))
        })?;

        let customer_id = self.pick_customer(index);
        let product_id = self.pick_product(index, day.date);

        let mut rng = self.seeds.stream(DOMAIN, "orders", "quantity", index);
        let quantity = match rng.random_range(0..100_u32) {
            0..50 => 1,
            50..80 => 2,
            80..90 => 3,
            90..95 => 4,
            _ => 5,
        };

        let unit_price = self.product_base_price(product_id);
        let mut rng = self.seeds.stream(DOMAIN, "orders", "price-factor", index);
        let factor = 0.95 + rng.random::<f64>() * 0.10;
        let total = round2(quantity as f64 * unit_price * factor);

        Ok(OrderParts {
            date: day.date,
            customer_id,
            product_id,
            quantity,
            unit_price,
            total,
        })
    }

    fn order_row(&self, index: u64, schedule: &DaySchedule) -> Result<Row, EngineError> {
        let parts = self.order_parts(index, schedule)?;
        Ok(vec![
            Value::Int(index as i64),
            Value::Date(parts.date),
            Value::Int(parts.customer_id as i64),
            Value::Int(parts.product_id as i64),
            Value::Text(self.product_name(parts.product_id)),
            Value::Int(i64::from(parts.quantity)),
            Value::Float(parts.unit_price),
            Value::Float(parts.total),
        ])
    }

    fn payment_row(&self, index: u64, schedule: &DaySchedule) -> Result<Row, EngineError> {
        let parts = self.order_parts(index, schedule)?;

        let mut rng = self.seeds.stream(DOMAIN, "payments", "lag", index);
        let payment_date = parts.date + Duration::days(rng.random_range(0..=3));

        let mut rng = self.seeds.stream(DOMAIN, "payments", "method", index);
        let method = match rng.random_range(0..100_u32) {
            0..40 => PAYMENT_METHODS[0],
            40..70 => PAYMENT_METHODS[1],
            70..85 => PAYMENT_METHODS[2],
            85..95 => PAYMENT_METHODS[3],
            _ => PAYMENT_METHODS[4],
        };

        let mut rng = self.seeds.stream(DOMAIN, "payments", "status", index);
        let status = if rng.random_range(0..100_u32) < 95 {
            "COMPLETED"
        } else {
            "FAILED"
        };

        Ok(vec![
            Value::Int(index as i64),
            Value::Int(index as i64),
            Value::Date(parts.date),
            Value::Date(payment_date),
            Value::Text(method.to_string()),
            Value::Float(parts.total),
            Value::Text(status.to_string()),
        ])
    }
}

struct OrderParts {
    date: NaiveDate,
    customer_id: u64,
    product_id: u64,
    quantity: u8,
    unit_price: f64,
    total: f64,
}

impl DomainHandler for SalesDomain {
    fn name(&self) -> &str {
        DOMAIN
    }

    fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    fn materialize(
        &self,
        table: &str,
        range: Range<u64>,
        schedule: &DaySchedule,
    ) -> Result<Vec<Row>, EngineError> {
        match table {
            "customers" => Ok(range.map(|index| self.customer_row(index)).collect()),
            "products" => Ok(range.map(|index| self.product_row(index)).collect()),
            "orders" => range
                .map(|index| self.order_row(index, schedule))
                .collect(),
            "payments" => range
                .map(|index| self.payment_row(index, schedule))
                .collect(),
            other => Err(EngineError::UnknownTable(other.to_string())),
        }
    }
}

fn build_tables(params: &SalesParams) -> Vec<TableSpec> {
    let customers = {
        let mut spec = TableSpec::new(
            "customers",
            vec![
                ColumnSpec::new("customer_id", ColumnKind::Int),
                ColumnSpec::new("first_name", ColumnKind::Text),
                ColumnSpec::new("last_name", ColumnKind::Text),
                ColumnSpec::new("email", ColumnKind::Text),
                ColumnSpec::new("phone_number", ColumnKind::Text),
                ColumnSpec::new("city", ColumnKind::Text),
            ],
            TableVolume::Fixed(params.customers),
            72,
        );
        spec.key_column = Some(0);
        spec.nullable = vec![3, 4, 5];
        spec.text_noise = vec![1, 2, 5];
        spec
    };

    let products = {
        let mut spec = TableSpec::new(
            "products",
            vec![
                ColumnSpec::new("product_id", ColumnKind::Int),
                ColumnSpec::new("product_name", ColumnKind::Text),
                ColumnSpec::new("category", ColumnKind::Text),
                ColumnSpec::new("seasonal_tag", ColumnKind::Text),
                ColumnSpec::new("base_price", ColumnKind::Money),
            ],
            TableVolume::Fixed(params.products),
            48,
        );
        spec.key_column = Some(0);
        spec.text_noise = vec![1];
        spec
    };

    let orders = {
        let mut spec = TableSpec::new(
            "orders",
            vec![
                ColumnSpec::new("order_id", ColumnKind::Int),
                ColumnSpec::new("order_date", ColumnKind::Date),
                ColumnSpec::new("customer_id", ColumnKind::Int),
                ColumnSpec::new("product_id", ColumnKind::Int),
                ColumnSpec::new("product_name", ColumnKind::Text),
                ColumnSpec::new("quantity", ColumnKind::Int),
                ColumnSpec::new("unit_price", ColumnKind::Money),
                ColumnSpec::new("total_amount", ColumnKind::Money),
            ],
            TableVolume::PerEvent,
            68,
        );
        spec.key_column = Some(0);
        spec.nullable = vec![4];
        spec.text_noise = vec![4];
        spec.foreign_keys = vec![
            ForeignKeyTarget {
                column: 2,
                referenced_table: "customers".to_string(),
                id_space: IdSpace::Fixed(params.customers),
            },
            ForeignKeyTarget {
                column: 3,
                referenced_table: "products".to_string(),
                id_space: IdSpace::Fixed(params.products),
            },
        ];
        spec
    };

    let payments = {
        let mut spec = TableSpec::new(
            "payments",
            vec![
                ColumnSpec::new("payment_id", ColumnKind::Int),
                ColumnSpec::new("order_id", ColumnKind::Int),
                ColumnSpec::new("order_date", ColumnKind::Date),
                ColumnSpec::new("payment_date", ColumnKind::Date),
                ColumnSpec::new("payment_method", ColumnKind::Text),
                ColumnSpec::new("amount", ColumnKind::Money),
                ColumnSpec::new("status", ColumnKind::Text),
            ],
            TableVolume::PerEvent,
            58,
        );
        spec.key_column = Some(0);
        spec.nullable = vec![4];
        spec.foreign_keys = vec![ForeignKeyTarget {
            column: 1,
            referenced_table: "orders".to_string(),
            id_space: IdSpace::EventCount,
        }];
        spec.date_pairs = vec![DatePair {
            earlier: 2,
            later: 3,
        }];
        spec
    };

    vec![customers, products, orders, payments]
}

fn pick(
    seeds: &SeedDerivation,
    table: &str,
    purpose: &str,
    index: u64,
    options: &'static [&'static str],
) -> &'static str {
    let mut rng = seeds.stream(DOMAIN, table, purpose, index);
    options[rng.random_range(0..options.len())]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
