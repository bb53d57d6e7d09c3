use serde::Serialize;

/// How a raw input value is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Float,
    Text,
}

/// One input field: its API name and the dataset column it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, column: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, column, kind }
}

use FieldKind::{Float, Integer, Text};

/// Every feature a client may send. All are optional; absent ones are
/// imputed by the fitted pipeline.
pub struct HouseFeatures;

impl HouseFeatures {
    pub const FIELDS: &'static [FieldSpec] = &[
        field("ms_sub_class", "MS SubClass", Integer),
        field("ms_zoning", "MS Zoning", Text),
        field("lot_frontage", "Lot Frontage", Float),
        field("lot_area", "Lot Area", Integer),
        field("street", "Street", Text),
        field("alley", "Alley", Text),
        field("lot_shape", "Lot Shape", Text),
        field("land_contour", "Land Contour", Text),
        field("utilities", "Utilities", Text),
        field("lot_config", "Lot Config", Text),
        field("land_slope", "Land Slope", Text),
        field("neighborhood", "Neighborhood", Text),
        field("condition_1", "Condition 1", Text),
        field("condition_2", "Condition 2", Text),
        field("bldg_type", "Bldg Type", Text),
        field("house_style", "House Style", Text),
        field("overall_qual", "Overall Qual", Integer),
        field("overall_cond", "Overall Cond", Integer),
        field("year_built", "Year Built", Integer),
        field("year_remod_add", "Year Remod/Add", Integer),
        field("roof_style", "Roof Style", Text),
        field("roof_matl", "Roof Matl", Text),
        field("exterior_1st", "Exterior 1st", Text),
        field("exterior_2nd", "Exterior 2nd", Text),
        field("mas_vnr_type", "Mas Vnr Type", Text),
        field("mas_vnr_area", "Mas Vnr Area", Float),
        field("exter_qual", "Exter Qual", Text),
        field("exter_cond", "Exter Cond", Text),
        field("foundation", "Foundation", Text),
        field("bsmt_qual", "Bsmt Qual", Text),
        field("bsmt_cond", "Bsmt Cond", Text),
        field("bsmt_exposure", "Bsmt Exposure", Text),
        field("bsmt_fin_type_1", "BsmtFin Type 1", Text),
        field("bsmt_fin_sf_1", "BsmtFin SF 1", Float),
        field("bsmt_fin_type_2", "BsmtFin Type 2", Text),
        field("bsmt_fin_sf_2", "BsmtFin SF 2", Float),
        field("bsmt_unf_sf", "Bsmt Unf SF", Float),
        field("total_bsmt_sf", "Total Bsmt SF", Float),
        field("heating", "Heating", Text),
        field("heating_qc", "Heating QC", Text),
        field("central_air", "Central Air", Text),
        field("electrical", "Electrical", Text),
        field("first_flr_sf", "1st Flr SF", Integer),
        field("second_flr_sf", "2nd Flr SF", Integer),
        field("low_qual_fin_sf", "Low Qual Fin SF", Integer),
        field("gr_liv_area", "Gr Liv Area", Integer),
        field("bsmt_full_bath", "Bsmt Full Bath", Float),
        field("bsmt_half_bath", "Bsmt Half Bath", Float),
        field("full_bath", "Full Bath", Integer),
        field("half_bath", "Half Bath", Integer),
        field("bedroom_abv_gr", "Bedroom AbvGr", Integer),
        field("kitchen_abv_gr", "Kitchen AbvGr", Integer),
        field("kitchen_qual", "Kitchen Qual", Text),
        field("tot_rms_abv_grd", "TotRms AbvGrd", Integer),
        field("functional", "Functional", Text),
        field("fireplaces", "Fireplaces", Integer),
        field("fireplace_qu", "Fireplace Qu", Text),
        field("garage_type", "Garage Type", Text),
        field("garage_yr_blt", "Garage Yr Blt", Float),
        field("garage_finish", "Garage Finish", Text),
        field("garage_cars", "Garage Cars", Float),
        field("garage_area", "Garage Area", Float),
        field("garage_qual", "Garage Qual", Text),
        field("garage_cond", "Garage Cond", Text),
        field("paved_drive", "Paved Drive", Text),
        field("wood_deck_sf", "Wood Deck SF", Integer),
        field("open_porch_sf", "Open Porch SF", Integer),
        field("enclosed_porch", "Enclosed Porch", Integer),
        field("three_ssn_porch", "3Ssn Porch", Integer),
        field("screen_porch", "Screen Porch", Integer),
        field("pool_area", "Pool Area", Integer),
        field("pool_qc", "Pool QC", Text),
        field("fence", "Fence", Text),
        field("misc_feature", "Misc Feature", Text),
        field("misc_val", "Misc Val", Integer),
        field("mo_sold", "Mo Sold", Integer),
        field("yr_sold", "Yr Sold", Integer),
        field("sale_type", "Sale Type", Text),
        field("sale_condition", "Sale Condition", Text),
    ];

    pub fn field(name: &str) -> Option<&'static FieldSpec> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }

    pub fn by_column(column: &str) -> Option<&'static FieldSpec> {
        Self::FIELDS.iter().find(|f| f.column == column)
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        Self::FIELDS.iter().map(|f| f.name)
    }
}
