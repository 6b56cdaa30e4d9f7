use super::types::{AssetProfile, Lifestyle, PartyProfile, Priorities};

pub const PRESET_IDS: [&str; 4] = ["compact-ev", "midsize-sedan", "family-suv", "pickup"];

/// Built-in vehicle terms used when a caller does not supply its own.
pub fn preset(id: &str) -> Option<AssetProfile> {
    let asset = match id {
        "compact-ev" => AssetProfile {
            name: "Compact EV".to_string(),
            price: 42_990.0,
            down_payment: 0.0,
            loan_apr: 0.0699,
            loan_term_months: 72,
            annual_depreciation: 0.15,
            lease_residual: 0.58,
            money_factor: 0.00125,
            lease_term_months: 36,
            lease_mileage_allowance: 12_000.0,
            overage_per_mile: 0.25,
            maintenance_rate: 0.008,
            insurance_monthly: 165.0,
            energy_cost_per_mile: 0.04,
        },
        "midsize-sedan" => AssetProfile {
            name: "Midsize Sedan".to_string(),
            price: 28_400.0,
            down_payment: 3_000.0,
            loan_apr: 0.0649,
            loan_term_months: 60,
            annual_depreciation: 0.12,
            lease_residual: 0.62,
            money_factor: 0.00105,
            lease_term_months: 36,
            lease_mileage_allowance: 12_000.0,
            overage_per_mile: 0.20,
            maintenance_rate: 0.012,
            insurance_monthly: 140.0,
            energy_cost_per_mile: 0.11,
        },
        "family-suv" => AssetProfile {
            name: "Family SUV".to_string(),
            price: 38_900.0,
            down_payment: 4_000.0,
            loan_apr: 0.0689,
            loan_term_months: 72,
            annual_depreciation: 0.14,
            lease_residual: 0.57,
            money_factor: 0.0014,
            lease_term_months: 36,
            lease_mileage_allowance: 10_000.0,
            overage_per_mile: 0.25,
            maintenance_rate: 0.014,
            insurance_monthly: 155.0,
            energy_cost_per_mile: 0.14,
        },
        "pickup" => AssetProfile {
            name: "Full-size Pickup".to_string(),
            price: 51_500.0,
            down_payment: 5_000.0,
            loan_apr: 0.0725,
            loan_term_months: 72,
            annual_depreciation: 0.11,
            lease_residual: 0.60,
            money_factor: 0.0016,
            lease_term_months: 39,
            lease_mileage_allowance: 12_000.0,
            overage_per_mile: 0.30,
            maintenance_rate: 0.015,
            insurance_monthly: 180.0,
            energy_cost_per_mile: 0.19,
        },
        _ => return None,
    };
    Some(asset)
}

pub fn presets() -> Vec<(&'static str, AssetProfile)> {
    PRESET_IDS
        .iter()
        .filter_map(|id| preset(id).map(|asset| (*id, asset)))
        .collect()
}

pub fn default_party() -> PartyProfile {
    PartyProfile {
        credit_score: 740,
        annual_income: 95_000.0,
        monthly_budget: 650.0,
        annual_miles: 12_000.0,
        priorities: Priorities {
            low_monthly_cost: 7,
            long_term_value: 6,
            flexibility: 5,
            latest_technology: 4,
            low_maintenance: 6,
        },
        lifestyle: Lifestyle {
            growing_family: false,
            stable_income: true,
            long_road_trips: false,
            enjoys_new_vehicles: false,
        },
    }
}
