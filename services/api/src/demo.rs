use chrono::{Local, NaiveDate};
use clap::Args;
use valuation_engine::error::AppError;
use valuation_engine::valuation::{
    AdjustmentsPolicy, Comp, CompKind, MarketTimeAdjustment, Subject, ValuationEngine,
    ValuationRequest,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Valuation date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Minimum closed-sale comps before the listing fallback kicks in.
    #[arg(long, default_value_t = 3)]
    pub(crate) min_closed_comps: usize,
    /// How many sorted comps feed the median set.
    #[arg(long, default_value_t = 5)]
    pub(crate) median_set_size: usize,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());

    let mut policy = AdjustmentsPolicy::default();
    policy.unit_values.beds = 5_000.0;
    policy.unit_values.baths = 7_500.0;
    policy.unit_values.lot_per_sqft = 1.5;
    policy.unit_values.year_built_per_year = 350.0;

    let engine = ValuationEngine::new(policy);
    let outcome = engine.run(&ValuationRequest {
        subject: demo_subject(),
        comps: demo_comps(),
        as_of: Some(as_of),
        min_closed_comps: args.min_closed_comps,
        median_set_size: args.median_set_size,
    })?;

    let rendered = serde_json::to_string_pretty(&outcome)
        .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))?;
    println!("{rendered}");
    Ok(())
}

fn demo_subject() -> Subject {
    Subject {
        sqft: Some(1_800.0),
        beds: Some(3.0),
        baths: Some(2.0),
        lot_sqft: Some(7_000.0),
        year_built: Some(1_995.0),
    }
}

fn demo_comps() -> Vec<Comp> {
    let template = Comp {
        id: String::new(),
        comp_kind: CompKind::ClosedSale,
        price: None,
        sqft: None,
        beds: None,
        baths: None,
        lot_sqft: None,
        year_built: None,
        close_date: None,
        distance_miles: None,
        market_time_adjustment: None,
        price_adjusted: None,
    };

    let mut comps = Vec::new();
    let rows: [(&str, f64, f64, f64, f64, f64, &str, f64); 5] = [
        ("comp-01", 342_000.0, 1_750.0, 3.0, 2.0, 6_800.0, "2025-06-12", 0.4),
        ("comp-02", 355_000.0, 1_900.0, 4.0, 2.5, 7_200.0, "2025-05-03", 0.7),
        ("comp-03", 328_500.0, 1_700.0, 3.0, 2.0, 6_500.0, "2025-04-21", 0.9),
        ("comp-04", 361_000.0, 1_950.0, 4.0, 3.0, 7_400.0, "2025-03-15", 1.2),
        ("comp-05", 337_000.0, 1_780.0, 3.0, 2.0, 7_000.0, "2025-02-02", 1.5),
    ];
    for (id, price, sqft, beds, baths, lot, closed, distance) in rows {
        let mut comp = template.clone();
        comp.id = id.to_string();
        comp.price = Some(price);
        comp.sqft = Some(sqft);
        comp.beds = Some(beds);
        comp.baths = Some(baths);
        comp.lot_sqft = Some(lot);
        comp.year_built = Some(1_992.0);
        comp.close_date = NaiveDate::parse_from_str(closed, "%Y-%m-%d").ok();
        comp.distance_miles = Some(distance);
        comp.market_time_adjustment = Some(MarketTimeAdjustment {
            factor: Some(1.02),
            applied: true,
        });
        comps.push(comp);
    }
    comps
}
