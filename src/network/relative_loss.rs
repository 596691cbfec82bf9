use {
    kahan::KahanSummator,
    serde::{Serialize, Deserialize},
    strum::EnumString,
    super::{
        catalog::Catalog,
        error::ModelError,
        operators::FlowVector
    }
};

/// Which region label is not a receiving region.
///
/// Parses `last-unique`, `keep`, anything else is taken as a label.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum RegionExclusion{
    /// The last distinct region label of the information table is a sentinel
    #[default]
    #[strum(serialize = "last-unique", serialize = "lastunique")]
    LastUnique,
    /// Every region receives
    Keep,
    /// A named sentinel label
    #[strum(default)]
    Label(String)
}

impl RegionExclusion{
    /// Receiving regions in order of first appearance
    pub fn receiving_regions<'a>(&self, catalog: &'a Catalog) -> Vec<&'a str>
    {
        let labels = catalog.region_labels();
        let iter = labels.iter().map(String::as_str);
        match self{
            Self::LastUnique => {
                iter.take(labels.len().saturating_sub(1)).collect()
            },
            Self::Keep => iter.collect(),
            Self::Label(sentinel) => iter.filter(|r| *r != sentinel.as_str()).collect()
        }
    }
}

/// `1 - shocked / baseline`, zero for a zero baseline and clipped at zero
#[inline]
pub fn loss_ratio(baseline: f64, shocked: f64) -> f64
{
    if baseline == 0.0 {
        0.0
    } else {
        // max also maps NaN to 0
        (1.0 - shocked / baseline).max(0.0)
    }
}

/// Relative loss per (receiving region, item) for one shock origin
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeLoss{
    pub shock_country: String,
    pub shock_item: String,
    pub regions: Vec<String>,
    pub items: Vec<String>,
    /// region-major, item-minor
    pub values: Vec<f64>
}

impl RelativeLoss{
    #[cfg(test)]
    pub fn get(&self, region: usize, item: usize) -> f64
    {
        self.values[region * self.items.len() + item]
    }

    /// `(region, item, loss)` in table order
    pub fn rows(&'_ self) -> impl Iterator<Item = (&'_ str, &'_ str, f64)> + '_
    {
        let n = self.items.len();
        self.values
            .iter()
            .enumerate()
            .map(
                move |(i, &v)|
                {
                    (self.regions[i / n].as_str(), self.items[i % n].as_str(), v)
                }
            )
    }
}

/// Aggregate baseline and shocked flows by region, leaving out the shock origin,
/// and turn the totals into relative losses.
pub fn relative_loss(
    catalog: &Catalog,
    baseline: &FlowVector,
    shocked: &FlowVector,
    shock_country: usize,
    exclusion: &RegionExclusion,
    shock_item: &str
) -> Result<RelativeLoss, ModelError>
{
    let index = catalog.country_item();
    if !baseline.index().is_compatible(index){
        return Err(ModelError::IndexMismatch { operator: "baseline flow".to_owned() });
    }
    if !shocked.index().is_compatible(index){
        return Err(ModelError::IndexMismatch { operator: "shocked flow".to_owned() });
    }

    let regions = exclusion.receiving_regions(catalog);
    let n_items = catalog.items().len();
    let base = baseline.as_slice();
    let shock = shocked.as_slice();

    let mut values = Vec::with_capacity(regions.len() * n_items);
    for region in regions.iter(){
        let members: Vec<usize> = catalog.countries_in_region(region)
            .filter(|&c| c != shock_country)
            .collect();
        for item in 0..n_items{
            let positions = members.iter()
                .map(|&c| index.position(c, item));
            let base_total = positions.clone()
                .map(|p| base[p])
                .kahan_sum()
                .sum();
            let shocked_total = positions
                .map(|p| shock[p])
                .kahan_sum()
                .sum();
            values.push(loss_ratio(base_total, shocked_total));
        }
    }

    Ok(
        RelativeLoss {
            shock_country: catalog.countries()[shock_country].clone(),
            shock_item: shock_item.to_owned(),
            regions: regions.into_iter().map(str::to_owned).collect(),
            items: catalog.items().to_vec(),
            values
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{
        campaign::Campaign,
        catalog::tests::*,
        dynamics::tests::*,
        operators::DomainVector
    };

    fn region_catalog() -> Catalog
    {
        // the last region is the world aggregate
        Catalog::new(
            strings(&["A", "B", "C", "D", "W"]),
            strings(&["Wheat", "Rice"]),
            strings(&["Mill"]),
            vec![
                info("A", "Europe", "AAA"),
                info("B", "Asia", "BBB"),
                info("C", "Europe", "CCC"),
                info("D", "Asia", "DDD"),
                info("W", "World", "WLD")
            ]
        ).unwrap()
    }

    fn flow(catalog: &Catalog, values: &[f64]) -> FlowVector
    {
        DomainVector::new(catalog.country_item(), values.to_vec()).unwrap()
    }

    #[test]
    fn ratio_rules()
    {
        assert_eq!(loss_ratio(0.0, 5.0), 0.0);
        assert_eq!(loss_ratio(0.0, 0.0), 0.0);
        assert_eq!(loss_ratio(4.0, 1.0), 0.75);
        assert_eq!(loss_ratio(4.0, 8.0), 0.0);
        assert_eq!(loss_ratio(4.0, 0.0), 1.0);
        assert_eq!(loss_ratio(f64::NAN, 1.0), 0.0);
    }

    #[test]
    fn exclusion_rules()
    {
        let catalog = region_catalog();
        assert_eq!(RegionExclusion::LastUnique.receiving_regions(&catalog), vec!["Europe", "Asia"]);
        assert_eq!(RegionExclusion::Keep.receiving_regions(&catalog), vec!["Europe", "Asia", "World"]);
        assert_eq!(
            RegionExclusion::Label("Asia".to_owned()).receiving_regions(&catalog),
            vec!["Europe", "World"]
        );
        assert_eq!("keep".parse::<RegionExclusion>(), Ok(RegionExclusion::Keep));
        assert_eq!("Last-Unique".parse::<RegionExclusion>(), Ok(RegionExclusion::LastUnique));
        assert_eq!("LASTUNIQUE".parse::<RegionExclusion>(), Ok(RegionExclusion::LastUnique));
        assert_eq!("World".parse::<RegionExclusion>(), Ok(RegionExclusion::Label("World".to_owned())));
        assert_eq!("".parse::<RegionExclusion>(), Ok(RegionExclusion::Label(String::new())));
    }

    #[test]
    fn aggregation_leaves_out_shock_country()
    {
        let catalog = region_catalog();
        //                     A          B          C          D          W
        let base = flow(&catalog, &[4.0, 2.0, 1.0, 0.0, 4.0, 0.0, 3.0, 0.0, 100.0, 100.0]);
        let shocked = flow(&catalog, &[0.0, 0.0, 0.5, 3.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        let a = catalog.country_index("A").unwrap();
        let rl = relative_loss(&catalog, &base, &shocked, a, &RegionExclusion::LastUnique, "complete")
            .unwrap();

        assert_eq!(rl.shock_country, "A");
        assert_eq!(rl.regions, vec!["Europe", "Asia"]);
        assert_eq!(rl.values.len(), 4);
        // Europe without A is C alone
        assert_eq!(rl.get(0, 0), 0.75);
        // zero baseline
        assert_eq!(rl.get(0, 1), 0.0);
        // Asia wheat: 1 - 1.5 / 4
        assert_eq!(rl.get(1, 0), 0.625);
        // Asia rice grows from 0 to 3, baseline zero
        assert_eq!(rl.get(1, 1), 0.0);

        let rows: Vec<_> = rl.rows().collect();
        assert_eq!(rows[2], ("Asia", "Wheat", 0.625));
    }

    #[test]
    fn never_negative()
    {
        let catalog = region_catalog();
        let base = flow(&catalog, &[1.0; 10]);
        let more = flow(&catalog, &[7.0; 10]);
        for shock in 0..5 {
            let rl = relative_loss(&catalog, &base, &more, shock, &RegionExclusion::Keep, "complete")
                .unwrap();
            assert!(rl.values.iter().all(|v| *v == 0.0));
            let rl = relative_loss(&catalog, &more, &base, shock, &RegionExclusion::Keep, "complete")
                .unwrap();
            assert!(rl.values.iter().all(|v| *v >= 0.0));
        }
    }

    #[test]
    fn flows_of_another_catalog_are_rejected()
    {
        let catalog = region_catalog();
        let other = toy_catalog();
        let base = flow(&catalog, &[1.0; 10]);
        let foreign = DomainVector::zeros(other.country_item());
        let err = relative_loss(&catalog, &base, &foreign, 0, &RegionExclusion::Keep, "complete")
            .unwrap_err();
        assert_eq!(err, ModelError::IndexMismatch { operator: "shocked flow".to_owned() });
    }

    #[test]
    fn two_country_scenario()
    {
        let (catalog, ops) = two_country_model();
        let campaign = Campaign::new(&catalog, &ops, 3);
        let res = campaign.run_all(None).unwrap();
        let a = catalog.country_index("A").unwrap();
        let shocked = res.shocked_flow(a).unwrap();

        let rl = relative_loss(&catalog, &res.baseline, shocked, a, &RegionExclusion::Keep, "complete")
            .unwrap();
        // North only contains A, which is left out, South only B with zero baseline
        assert_eq!(rl.regions, vec!["North", "South"]);
        assert_eq!(rl.values, vec![0.0, 0.0]);

        let rl = relative_loss(&catalog, &res.baseline, shocked, a, &RegionExclusion::LastUnique, "complete")
            .unwrap();
        assert_eq!(rl.regions, vec!["North"]);
    }

    #[test]
    fn loss_from_trade_dependency()
    {
        let (catalog, ops) = trading_model();
        let campaign = Campaign::new(&catalog, &ops, 4);
        let res = campaign.run_all(None).unwrap();
        let a = catalog.country_index("A").unwrap();
        let rl = relative_loss(
            &catalog,
            &res.baseline,
            res.shocked_flow(a).unwrap(),
            a,
            &RegionExclusion::Keep,
            "complete"
        ).unwrap();
        // B imports all of its wheat from A
        let wheat_europe = rl.get(0, 0);
        assert!(wheat_europe > 0.99 && wheat_europe <= 1.0, "{wheat_europe}");
        assert!(rl.values.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
