use {
    std::{
        collections::{HashMap, HashSet},
        ops::Range,
        sync::Arc
    },
    itertools::Itertools,
    super::error::ModelError
};

/// Region and output code of one country
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountryInfo{
    pub region: String,
    pub code: String
}

/// What the minor dimension of a composite index enumerates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MinorKind{
    Item,
    Process
}

/// Country-major, minor-minor product index.
///
/// Position of `(c, m)` is `c * minor_len + m`.
/// Every flow vector and operator holds an `Arc` to one of these,
/// two indices are compatible only if they enumerate the same labels in the same order.
#[derive(Debug, PartialEq, Eq)]
pub struct CompositeIndex{
    kind: MinorKind,
    countries: Arc<[String]>,
    minors: Arc<[String]>
}

impl CompositeIndex{
    fn new(kind: MinorKind, countries: Arc<[String]>, minors: Arc<[String]>) -> Self
    {
        Self { kind, countries, minors }
    }

    pub fn len(&self) -> usize
    {
        self.countries.len() * self.minors.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    #[inline]
    pub fn position(&self, country: usize, minor: usize) -> usize
    {
        debug_assert!(country < self.countries.len());
        debug_assert!(minor < self.minors.len());
        country * self.minors.len() + minor
    }

    /// `(country, minor)` belonging to a flat position
    #[inline]
    pub fn key(&self, position: usize) -> (usize, usize)
    {
        let n = self.minors.len();
        (position / n, position % n)
    }

    /// All positions `(country, *)`
    pub fn country_range(&self, country: usize) -> Range<usize>
    {
        let n = self.minors.len();
        country * n..(country + 1) * n
    }

    /// Iterate over the labels in flat order
    pub fn labels(&'_ self) -> impl Iterator<Item = (&'_ str, &'_ str)> + '_
    {
        self.countries
            .iter()
            .cartesian_product(self.minors.iter())
            .map(|(c, m)| (c.as_str(), m.as_str()))
    }

    /// Same index object or same labels in the same order
    pub fn is_compatible(&self, other: &Self) -> bool
    {
        std::ptr::eq(self, other) || self == other
    }
}

/// Immutable enumeration of countries, items and processes.
#[derive(Debug)]
pub struct Catalog{
    countries: Arc<[String]>,
    items: Arc<[String]>,
    processes: Arc<[String]>,
    country_lookup: HashMap<String, usize>,
    item_lookup: HashMap<String, usize>,
    info: Vec<CountryInfo>,
    /// distinct region labels, order of first appearance in the information table
    region_labels: Vec<String>,
    country_item: Arc<CompositeIndex>,
    country_process: Arc<CompositeIndex>
}

fn lookup_without_duplicates(list: &[String], name: &'static str) -> Result<HashMap<String, usize>, ModelError>
{
    let mut map = HashMap::with_capacity(list.len());
    for (idx, id) in list.iter().enumerate(){
        if map.insert(id.clone(), idx).is_some(){
            return Err(
                ModelError::DuplicateIdentifier { list: name, identifier: id.clone() }
            );
        }
    }
    Ok(map)
}

impl Catalog{
    /// `info_table` is in the row order of the country information table,
    /// which also defines the order of the regions.
    pub fn new(
        countries: Vec<String>,
        items: Vec<String>,
        processes: Vec<String>,
        info_table: Vec<(String, CountryInfo)>
    ) -> Result<Self, ModelError>
    {
        let country_lookup = lookup_without_duplicates(&countries, "country")?;
        let item_lookup = lookup_without_duplicates(&items, "item")?;
        lookup_without_duplicates(&processes, "process")?;

        let mut info: Vec<Option<CountryInfo>> = vec![None; countries.len()];
        let mut region_labels = Vec::new();
        let mut seen_regions = HashSet::new();
        for (country, country_info) in info_table {
            let idx = *country_lookup.get(&country)
                .ok_or_else(|| ModelError::UnknownCountry { country: country.clone() })?;
            if seen_regions.insert(country_info.region.clone()){
                region_labels.push(country_info.region.clone());
            }
            if info[idx].replace(country_info).is_some(){
                return Err(
                    ModelError::DuplicateIdentifier { list: "country information", identifier: country }
                );
            }
        }
        let info = info.into_iter()
            .zip(countries.iter())
            .map(
                |(i, country)|
                {
                    i.ok_or_else(|| ModelError::MissingCountryInfo { country: country.clone() })
                }
            ).collect::<Result<Vec<_>, _>>()?;

        let countries: Arc<[String]> = countries.into();
        let items: Arc<[String]> = items.into();
        let processes: Arc<[String]> = processes.into();
        let country_item = Arc::new(
            CompositeIndex::new(MinorKind::Item, countries.clone(), items.clone())
        );
        let country_process = Arc::new(
            CompositeIndex::new(MinorKind::Process, countries.clone(), processes.clone())
        );

        Ok(
            Self {
                countries,
                items,
                processes,
                country_lookup,
                item_lookup,
                info,
                region_labels,
                country_item,
                country_process
            }
        )
    }

    pub fn countries(&self) -> &[String]
    {
        &self.countries
    }

    pub fn items(&self) -> &[String]
    {
        &self.items
    }

    pub fn processes(&self) -> &[String]
    {
        &self.processes
    }

    /// The (country, item) domain of every flow vector
    pub fn country_item(&self) -> &Arc<CompositeIndex>
    {
        &self.country_item
    }

    /// The (country, process) domain used inside the process allocation
    pub fn country_process(&self) -> &Arc<CompositeIndex>
    {
        &self.country_process
    }

    pub fn country_index(&self, country: &str) -> Result<usize, ModelError>
    {
        self.country_lookup
            .get(country)
            .copied()
            .ok_or_else(
                || ModelError::NotInCatalog { kind: "country", identifier: country.to_owned() }
            )
    }

    pub fn item_index(&self, item: &str) -> Result<usize, ModelError>
    {
        self.item_lookup
            .get(item)
            .copied()
            .ok_or_else(
                || ModelError::NotInCatalog { kind: "item", identifier: item.to_owned() }
            )
    }

    pub fn region_of(&self, country: usize) -> &str
    {
        &self.info[country].region
    }

    pub fn code_of(&self, country: usize) -> &str
    {
        &self.info[country].code
    }

    /// Distinct region labels in order of first appearance
    pub fn region_labels(&self) -> &[String]
    {
        &self.region_labels
    }

    /// Indices of all countries of a region, in country order
    pub fn countries_in_region<'a>(&'a self, region: &'a str) -> impl Iterator<Item = usize> + 'a
    {
        self.info
            .iter()
            .positions(move |i| i.region == region)
    }
}
