use {
    std::{
        borrow::Cow,
        io::Write
    },
    crate::network::{Catalog, FlowVector, RelativeLoss}
};

/// Quote a csv field if needed, quotes inside are doubled
fn field(s: &'_ str) -> Cow<'_, str>
{
    if s.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

fn write_flow_rows<W: Write>(mut w: W, catalog: &Catalog, flow: &FlowVector) -> std::io::Result<()>
{
    for ((country, item), value) in catalog.country_item().labels().zip(flow.as_slice())
    {
        writeln!(w, "{},{},{value}", field(country), field(item))?;
    }
    Ok(())
}

/// `area,item,base` followed by one row per (country, item)
pub fn write_baseline_table<W: Write>(mut w: W, catalog: &Catalog, flow: &FlowVector) -> std::io::Result<()>
{
    writeln!(w, "area,item,base")?;
    write_flow_rows(w, catalog, flow)
}

/// Flow table of one shock country, column labels in two header rows
pub fn write_shock_table<W: Write>(
    mut w: W,
    catalog: &Catalog,
    shock_country: &str,
    item_category: &str,
    flow: &FlowVector
) -> std::io::Result<()>
{
    writeln!(w, "shock_area,,{}", field(shock_country))?;
    writeln!(w, "shock_item,,{}", field(item_category))?;
    writeln!(w, "area,item,")?;
    write_flow_rows(w, catalog, flow)
}

/// One row per (receiving region, receiving item)
pub fn write_relative_loss_table<W: Write>(mut w: W, loss: &RelativeLoss) -> std::io::Result<()>
{
    writeln!(w, "c_shock,,{}", field(&loss.shock_country))?;
    writeln!(w, "i_shock,,{}", field(&loss.shock_item))?;
    writeln!(w, "c_receive,i_receive,")?;
    for (region, item, value) in loss.rows()
    {
        writeln!(w, "{},{},{value}", field(region), field(item))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        network::{catalog::tests::*, DomainVector, RegionExclusion, relative_loss},
        parser::parse_flow_table
    };

    #[test]
    fn quoting()
    {
        assert_eq!(field("Kenya"), "Kenya");
        assert_eq!(field("Korea, Republic of"), "\"Korea, Republic of\"");
        assert_eq!(field("Say \"Hi\""), "\"Say \"\"Hi\"\"\"");
    }

    #[test]
    fn names_with_quotes_read_back()
    {
        let catalog = Catalog::new(
            strings(&["Say \"Hi\", Land", "Plain"]),
            strings(&["Wheat", "Rice, \"brown\""]),
            strings(&["Mill"]),
            vec![
                info("Say \"Hi\", Land", "Europe", "SHL"),
                info("Plain", "Asia", "PLN")
            ]
        ).unwrap();
        let flow = DomainVector::new(catalog.country_item(), vec![1.0, 2.0, 3.0, 4.0]).unwrap();

        let mut out = Vec::new();
        write_baseline_table(&mut out, &catalog, &flow).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"Say \"\"Hi\"\", Land\",\"Rice, \"\"brown\"\"\",2\n"));
        let back = parse_flow_table(text.as_bytes(), &catalog).unwrap();
        assert_eq!(back, flow);

        let mut out = Vec::new();
        write_shock_table(&mut out, &catalog, "Say \"Hi\", Land", "complete", &flow).unwrap();
        let back = parse_flow_table(out.as_slice(), &catalog).unwrap();
        assert_eq!(back, flow);
    }

    #[test]
    fn baseline_layout()
    {
        let catalog = toy_catalog();
        let flow = DomainVector::new(catalog.country_item(), vec![1.0, 0.5, 0.0, 2.0, 3.0, 1e-7]).unwrap();
        let mut out = Vec::new();
        write_baseline_table(&mut out, &catalog, &flow).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "area,item,base");
        assert_eq!(lines[1], "A,Wheat,1");
        assert_eq!(lines[2], "A,Rice,0.5");
        assert_eq!(lines[6], "C,Rice,0.0000001");
    }

    #[test]
    fn shock_table_reads_back()
    {
        let catalog = toy_catalog();
        let values = vec![1.0 / 3.0, 0.25, 12345.678, 0.0, 7.0, 2.0_f64.sqrt()];
        let flow = DomainVector::new(catalog.country_item(), values).unwrap();
        let mut out = Vec::new();
        crate::misc::write_commands_and_version(&mut out).unwrap();
        write_shock_table(&mut out, &catalog, "B", "complete", &flow).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("shock_area,,B\nshock_item,,complete\narea,item,\n"));
        let back = parse_flow_table(text.as_bytes(), &catalog).unwrap();
        assert_eq!(back, flow);
    }

    #[test]
    fn relative_loss_layout()
    {
        let catalog = toy_catalog();
        let base = DomainVector::new(catalog.country_item(), vec![1.0, 1.0, 4.0, 2.0, 4.0, 2.0]).unwrap();
        let shocked = DomainVector::new(catalog.country_item(), vec![0.0, 0.0, 1.0, 2.0, 3.0, 3.0]).unwrap();
        let loss = relative_loss(&catalog, &base, &shocked, 0, &RegionExclusion::Keep, "complete")
            .unwrap();
        let mut out = Vec::new();
        write_relative_loss_table(&mut out, &loss).unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = "c_shock,,A\n\
            i_shock,,complete\n\
            c_receive,i_receive,\n\
            Europe,Wheat,0.25\n\
            Europe,Rice,0\n\
            Asia,Wheat,0.75\n\
            Asia,Rice,0\n";
        assert_eq!(text, expected);
    }
}
