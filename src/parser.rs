use {
    std::{
        borrow::Cow,
        io::{BufRead, Read},
        ops::Neg,
        path::Path
    },
    anyhow::{anyhow, bail, Context},
    itertools::Itertools,
    sprs::{
        TriMat,
        num_kinds::{Pattern, PrimitiveKind},
        num_matrixmarket::{MatrixMarketConjugate, MatrixMarketRead}
    },
    crate::{
        misc::open_bufreader,
        network::{Catalog, CountryInfo, DomainVector, FlowVector, Triplets}
    }
};

/// Splits one csv line.
///
/// Fields in double quotes may contain commas, `""` inside them is a literal quote.
pub struct LineIter<'a>
{
    line: &'a str,
}

impl<'a> LineIter<'a> {
    pub fn new(line: &'a str) -> Self
    {
        Self{line}
    }

    fn quoted(&mut self, mut rest: &'a str) -> Cow<'a, str>
    {
        let mut unescaped: Option<String> = None;
        let (last, after) = loop {
            match rest.split_once('"'){
                // unterminated quote, take the rest
                None => break (rest, ""),
                Some((chunk, after)) => {
                    match after.strip_prefix('"'){
                        Some(after) => {
                            let s = unescaped.get_or_insert_with(String::new);
                            s.push_str(chunk);
                            s.push('"');
                            rest = after;
                        },
                        None => break (chunk, after)
                    }
                }
            }
        };
        // skip next "," if it exists
        self.line = after.strip_prefix(',').unwrap_or(after);
        match unescaped{
            None => Cow::Borrowed(last),
            Some(mut s) => {
                s.push_str(last);
                Cow::Owned(s)
            }
        }
    }
}

impl<'a> Iterator for LineIter<'a>
{
    type Item = Cow<'a, str>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.line.is_empty(){
            return None;
        }
        if let Some(rest) = self.line.strip_prefix('"')
        {
            Some(self.quoted(rest))
        } else {
            match self.line.split_once(','){
                Some((next, rest)) => {
                    self.line = rest;
                    Some(Cow::Borrowed(next))
                },
                None => {
                    let next = self.line;
                    self.line = "";
                    Some(Cow::Borrowed(next))
                }
            }
        }
    }
}

pub fn line_to_str_vec(line: &'_ str) -> Vec<Cow<'_, str>>
{
    LineIter::new(line).collect()
}

/// Comment lines written by `write_commands_and_version`
fn is_comment(line: &str) -> bool
{
    line.starts_with('#')
}

/// One identifier per line, tab separated, no header. Only the first field is used.
pub fn parse_index_list<R: BufRead>(reader: R) -> anyhow::Result<Vec<String>>
{
    let mut list = Vec::new();
    for line in reader.lines(){
        let line = line?;
        let id = line.split('\t')
            .next()
            .unwrap_or_default()
            .trim_end_matches('\r');
        if !id.is_empty(){
            list.push(id.to_owned());
        }
    }
    Ok(list)
}

pub fn read_index_list<P>(path: P) -> anyhow::Result<Vec<String>>
where P: AsRef<Path>
{
    let p = path.as_ref();
    parse_index_list(open_bufreader(p)?)
        .with_context(|| format!("reading index list {p:?}"))
}

/// Country information table.
///
/// Header row required, `region` and `code` are found by name,
/// the country name sits in column `name_column`.
/// Rows are returned in file order.
pub fn parse_country_information<R: BufRead>(
    reader: R,
    name_column: usize
) -> anyhow::Result<Vec<(String, CountryInfo)>>
{
    let mut lines = reader.lines();
    let header = lines.next()
        .ok_or_else(|| anyhow!("country information table is empty"))??;
    let header = line_to_str_vec(header.trim_end_matches('\r'));
    let position = |name: &str| {
        header.iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("country information table has no column {name:?}"))
    };
    let region_idx = position("region")?;
    let code_idx = position("code")?;

    let mut table = Vec::new();
    for (line_number, line) in lines.enumerate(){
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty(){
            continue;
        }
        let fields = line_to_str_vec(line);
        let field = |idx: usize| {
            fields.get(idx)
                .map(|f| &**f)
                .ok_or_else(
                    || anyhow!("row {} of country information table has only {} fields", line_number + 2, fields.len())
                )
        };
        let info = CountryInfo {
            region: field(region_idx)?.to_owned(),
            code: field(code_idx)?.to_owned()
        };
        table.push((field(name_column)?.to_owned(), info));
    }
    Ok(table)
}

pub fn read_country_information<P>(path: P, name_column: usize) -> anyhow::Result<Vec<(String, CountryInfo)>>
where P: AsRef<Path>
{
    let p = path.as_ref();
    parse_country_information(open_bufreader(p)?, name_column)
        .with_context(|| format!("reading country information {p:?}"))
}

/// Coordinate entries through sprs, converted to 0-based f64 triplets
fn coordinate_triplets<N, F>(text: &str, to_f64: F) -> anyhow::Result<Triplets>
where N: PrimitiveKind + Clone + Neg<Output = N> + MatrixMarketRead + MatrixMarketConjugate,
    F: Fn(&N) -> f64
{
    let tri: TriMat<N> = sprs::io::read_matrix_market_from_bufread(&mut text.as_bytes())?;
    let entries = tri.row_inds()
        .iter()
        .zip(tri.col_inds())
        .zip(tri.data())
        .map(|((&row, &col), v)| (row, col, to_f64(v)))
        .collect();
    Ok(Triplets { shape: tri.shape(), entries })
}

/// sprs asserts that every entry lies inside the declared extent,
/// so out of range entries are rejected here.
fn check_coordinate_extent(data: &[&str]) -> anyhow::Result<()>
{
    fn numbers(line: &str) -> Vec<usize>
    {
        line.split_whitespace()
            .take(3)
            .map_while(|s| s.parse().ok())
            .collect()
    }
    let (rows, cols, nnz) = match data.first().map(|l| numbers(l)).as_deref(){
        Some(&[r, c, n]) => (r, c, n),
        _ => bail!("coordinate size line needs 3 entries")
    };
    for line in data.iter().skip(1).take(nnz){
        if let &[row, col, ..] = numbers(line).as_slice(){
            if row > rows || col > cols {
                bail!("entry ({row}, {col}) in line {line:?} lies outside of {rows}x{cols}");
            }
        }
    }
    Ok(())
}

/// Dense column major data, symmetric stores the lower triangle only
fn array_triplets(data: &[&str], symmetric: bool) -> anyhow::Result<Triplets>
{
    let mut data = data.iter();
    let size_line = data.next()
        .ok_or_else(|| anyhow!("matrix market file without size line"))?;
    let sizes = size_line.split_whitespace()
        .map(str::parse::<usize>)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid size line {size_line:?}"))?;
    let (rows, cols) = match sizes.as_slice(){
        &[r, c] => (r, c),
        _ => bail!("array size line needs 2 entries, got {size_line:?}")
    };
    let mut triplets = Triplets::new(rows, cols);
    for col in 0..cols{
        let start = if symmetric { col } else { 0 };
        for row in start..rows{
            let line = data.next()
                .ok_or_else(|| anyhow!("array data ended early at ({row}, {col})"))?;
            let value: f64 = line.split_whitespace()
                .next()
                .ok_or_else(|| anyhow!("missing value in line {line:?}"))?
                .parse()
                .with_context(|| format!("invalid value in line {line:?}"))?;
            triplets.push(row, col, value);
            if symmetric && row != col {
                triplets.push(col, row, value);
            }
        }
    }
    Ok(triplets)
}

/// Matrix Market file into 0-based triplets.
///
/// Supports `coordinate` with `real`, `integer` or `pattern` fields and
/// the dense `array` format with `real` or `integer` fields,
/// each `general` or `symmetric`.
pub fn parse_matrix_market<R: BufRead>(mut reader: R) -> anyhow::Result<Triplets>
{
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let mut lines = text.lines();
    let banner = lines.next()
        .ok_or_else(|| anyhow!("empty matrix market file"))?;
    let words: Vec<String> = banner.split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect();
    if words.len() < 5 || words[0] != "%%matrixmarket" || words[1] != "matrix" {
        bail!("invalid matrix market banner {banner:?}");
    }
    let field = words[3].as_str();
    if !matches!(field, "real" | "integer" | "pattern"){
        bail!("unsupported matrix market field {field:?}");
    }
    let symmetric = match words[4].as_str(){
        "general" => false,
        "symmetric" => true,
        other => bail!("unsupported matrix market symmetry {other:?}")
    };
    let data: Vec<&str> = lines
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('%'))
        .collect();
    if data.is_empty(){
        bail!("matrix market file without size line");
    }

    match words[2].as_str(){
        "coordinate" => {
            check_coordinate_extent(&data)?;
            // comments and blank lines are already gone
            let banner = words.join(" ");
            let cleaned = std::iter::once(banner.as_str())
                .chain(data.iter().copied())
                .join("\n");
            match field{
                "real" => coordinate_triplets::<f64, _>(&cleaned, |v| *v),
                "integer" => coordinate_triplets::<i64, _>(&cleaned, |v| *v as f64),
                _ => coordinate_triplets::<Pattern, _>(&cleaned, |_| 1.0)
            }
        },
        "array" => {
            if field == "pattern" {
                bail!("pattern field is only valid in coordinate format");
            }
            array_triplets(&data, symmetric)
        },
        other => bail!("unsupported matrix market format {other:?}")
    }
}

pub fn read_matrix_market<P>(path: P) -> anyhow::Result<Triplets>
where P: AsRef<Path>
{
    let p = path.as_ref();
    parse_matrix_market(open_bufreader(p)?)
        .with_context(|| format!("reading matrix market file {p:?}"))
}

/// Flow table as written by `output`, re-aligned to the catalog by (country, item).
///
/// Everything before the `area,item` header row is ignored, so both the
/// baseline and the shocked layout are accepted.
pub fn parse_flow_table<R: BufRead>(reader: R, catalog: &Catalog) -> anyhow::Result<FlowVector>
{
    let index = catalog.country_item();
    let mut values = vec![0.0; index.len()];
    let mut seen = vec![false; index.len()];
    let mut in_data = false;

    for line in reader.lines(){
        let line = line?;
        let line = line.trim_end_matches('\r');
        if is_comment(line) || line.is_empty(){
            continue;
        }
        if !in_data{
            in_data = line.starts_with("area,item");
            continue;
        }
        let fields = line_to_str_vec(line);
        let (country, item, value) = match fields.as_slice(){
            [c, i, v] => (&**c, &**i, &**v),
            _ => bail!("flow table row {line:?} does not have 3 fields")
        };
        let pos = index.position(
            catalog.country_index(country)?,
            catalog.item_index(item)?
        );
        if std::mem::replace(&mut seen[pos], true){
            bail!("flow table contains ({country}, {item}) twice");
        }
        values[pos] = value.parse()
            .with_context(|| format!("invalid value in row {line:?}"))?;
    }

    if !in_data{
        bail!("flow table has no area,item header row");
    }
    if let Some(missing) = seen.iter().position(|s| !s){
        let (c, i) = index.key(missing);
        bail!(
            "flow table misses ({}, {})",
            catalog.countries()[c],
            catalog.items()[i]
        );
    }
    Ok(DomainVector::new(index, values)?)
}

pub fn read_flow_table<P>(path: P, catalog: &Catalog) -> anyhow::Result<FlowVector>
where P: AsRef<Path>
{
    let p = path.as_ref();
    parse_flow_table(open_bufreader(p)?, catalog)
        .with_context(|| format!("reading flow table {p:?}"))
}
