use {
    std::{
        io::Write,
        num::NonZeroUsize
    },
    anyhow::Context,
    camino::Utf8Path,
    indicatif::ProgressIterator,
    itertools::Itertools,
    tracing::{info, warn},
    super::*,
    crate::{
        config::*,
        misc::*,
        output::*,
        parser::*
    }
};

/// Catalog and operators, validated against each other
pub struct Model{
    pub catalog: Catalog,
    pub operators: NetworkOperators
}

pub fn load_catalog(job: &SimulationJob) -> anyhow::Result<Catalog>
{
    let files = &job.input_files;
    let countries = read_index_list(job.input_path(&files.countries))?;
    let items = read_index_list(job.input_path(&files.items))?;
    let processes = read_index_list(job.input_path(&files.processes))?;
    let info_table = read_country_information(
        job.input_path(&files.country_information),
        files.country_name_column
    )?;
    let catalog = Catalog::new(countries, items, processes, info_table)
        .context("invalid index tables")?;
    info!(
        countries = catalog.countries().len(),
        items = catalog.items().len(),
        processes = catalog.processes().len(),
        regions = catalog.region_labels().len(),
        "catalog loaded"
    );
    Ok(catalog)
}

pub fn load_model(job: &SimulationJob) -> anyhow::Result<Model>
{
    let catalog = load_catalog(job)?;
    let files = &job.input_files;
    let read = |name: &str| read_matrix_market(job.input_path(name));
    let raw = RawOperators {
        x0: read(&files.x0)?,
        start_stock: read(&files.start_stock)?,
        eta_prod: read(&files.eta_prod)?,
        eta_exp: read(&files.eta_exp)?,
        nu: read(&files.nu)?,
        alpha: read(&files.alpha)?,
        beta: read(&files.beta)?,
        trade: read(&files.trade)?
    };
    let operators = NetworkOperators::from_raw(&catalog, raw)
        .context("invalid network operators")?;
    for (name, nnz) in operators.nnz_summary(){
        info!(operator = name, nnz, "operator loaded");
    }
    Ok(Model { catalog, operators })
}

/// Runs `f` on a local pool of `threads` threads, on the global pool otherwise
fn with_pool<T, F>(threads: Option<NonZeroUsize>, f: F) -> anyhow::Result<T>
where F: FnOnce() -> T + Send,
    T: Send
{
    match threads{
        None => Ok(f()),
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n.get())
                .build()?;
            Ok(pool.install(f))
        }
    }
}

/// Explicitly configured shock countries, `None` means every country
fn selected_countries(job: &SimulationJob, catalog: &Catalog) -> anyhow::Result<Option<Vec<usize>>>
{
    match &job.shock_countries{
        None => Ok(None),
        Some(list) => {
            let ids = list.iter()
                .map(|c| catalog.country_index(c))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(ids.into_iter().unique().collect()))
        }
    }
}

fn run_campaign(model: &Model, job: &SimulationJob, countries: Option<&[usize]>, quiet: bool) -> anyhow::Result<CampaignResult>
{
    let campaign = Campaign::new(&model.catalog, &model.operators, job.tau);
    let all = 0..model.catalog.countries().len();
    let (shock_countries, non_producers) = match countries{
        None => (all.len(), all.filter(|&c| !campaign.is_producer(c)).count()),
        Some(list) => (list.len(), list.iter().filter(|&&c| !campaign.is_producer(c)).count())
    };
    info!(
        shock_countries,
        non_producers,
        tau = campaign.tau(),
        "starting campaign"
    );
    let bar = indication_bar(shock_countries as u64, quiet);
    bar.set_message("Shocked scenarios");
    let result = with_pool(
        job.threads,
        || match countries{
            None => campaign.run_all(Some(&bar)),
            Some(list) => campaign.run(list, Some(&bar))
        }
    )??;
    bar.finish_and_clear();
    Ok(result)
}

fn create_dir(dir: &Utf8Path) -> anyhow::Result<()>
{
    fs_err::create_dir_all(dir)?;
    Ok(())
}

fn write_dump(job: &SimulationJob, model: &Model, result: &CampaignResult) -> anyhow::Result<()>
{
    let path = match job.dump_path(){
        None => return Ok(()),
        Some(p) => p
    };
    create_dir(&job.simulation_folder)?;
    let dump = result.to_dump(&model.catalog, job.tau);
    let mut buf = create_buf(&path)?;
    if job.dump == DumpFormat::Json{
        serde_json::to_writer_pretty(&mut buf, &dump)?;
    } else {
        bincode::serialize_into(&mut buf, &dump)?;
    }
    buf.flush()?;
    info!(%path, format = %job.dump, "campaign dumped");
    Ok(())
}

/// Baseline plus one shocked flow table per country
pub fn simulate(opt: JobOpt) -> anyhow::Result<()>
{
    let job = opt.load()?;
    let model = load_model(&job)?;
    let countries = selected_countries(&job, &model.catalog)?;
    let result = run_campaign(&model, &job, countries.as_deref(), opt.quiet)?;

    create_dir(&job.simulation_folder)?;
    let path = job.baseline_path();
    let mut buf = create_buf_with_command_and_version(&path)?;
    write_baseline_table(&mut buf, &model.catalog, &result.baseline)?;
    buf.flush()?;
    info!(%path, "baseline written");

    let catalog = &model.catalog;
    let bar = indication_bar(result.shocks.len() as u64, opt.quiet);
    bar.set_message("Writing");
    for (country, outcome) in result.shocks.iter().progress_with(bar)
    {
        let path = job.shock_path(catalog.code_of(*country));
        let mut buf = create_buf_with_command_and_version(&path)?;
        write_shock_table(
            &mut buf,
            catalog,
            &catalog.countries()[*country],
            &job.item_category,
            outcome.resolve(&result.baseline)
        )?;
        buf.flush()?;
    }
    info!(folder = %job.simulation_folder, tables = result.shocks.len(), "shocked scenarios written");

    write_dump(&job, &model, &result)
}

fn write_relative_loss(job: &SimulationJob, catalog: &Catalog, loss: &RelativeLoss, code: &str) -> anyhow::Result<()>
{
    let path = job.relative_loss_path(code);
    let mut buf = create_buf_with_command_and_version(&path)?;
    write_relative_loss_table(&mut buf, loss)?;
    buf.flush()?;
    let worst = loss.rows()
        .max_by(|a, b| a.2.total_cmp(&b.2));
    if let Some((region, item, value)) = worst{
        info!(
            shock = %loss.shock_country,
            regions = loss.regions.len(),
            items = catalog.items().len(),
            %region,
            %item,
            value,
            "largest relative loss"
        );
    }
    Ok(())
}

/// Relative loss of the configured shock country, computed from stored flow tables
pub fn relative_loss_exec(opt: RelativeLossOpt) -> anyhow::Result<()>
{
    let mut job = opt.job.load()?;
    if let Some(c) = opt.shock_country{
        job.shock_country = c;
    }
    if let Some(r) = opt.region_exclusion{
        job.region_exclusion = r;
    }
    let catalog = load_catalog(&job)?;
    let shock_country = catalog.country_index(&job.shock_country)?;
    let code = catalog.code_of(shock_country);

    let baseline = read_flow_table(job.baseline_path(), &catalog)?;
    let shocked = read_flow_table(job.shock_path(code), &catalog)?;

    let loss = relative_loss(
        &catalog,
        &baseline,
        &shocked,
        shock_country,
        &job.region_exclusion,
        &job.item_category
    )?;
    create_dir(&job.relative_loss_folder)?;
    write_relative_loss(&job, &catalog, &loss, code)
}

/// Simulation and relative loss in one go, no flow tables are written
pub fn run(opt: JobOpt) -> anyhow::Result<()>
{
    let job = opt.load()?;
    let model = load_model(&job)?;
    let catalog = &model.catalog;
    let countries = selected_countries(&job, catalog)?;
    let result = run_campaign(&model, &job, countries.as_deref(), opt.quiet)?;

    if job.region_exclusion.receiving_regions(catalog).is_empty(){
        warn!(exclusion = ?job.region_exclusion, "no receiving region left, tables will be empty");
    }

    create_dir(&job.relative_loss_folder)?;
    for (country, outcome) in result.shocks.iter()
    {
        let loss = relative_loss(
            catalog,
            &result.baseline,
            outcome.resolve(&result.baseline),
            *country,
            &job.region_exclusion,
            &job.item_category
        )?;
        write_relative_loss(&job, catalog, &loss, catalog.code_of(*country))?;
    }
    info!(folder = %job.relative_loss_folder, tables = result.shocks.len(), "relative losses written");

    write_dump(&job, &model, &result)
}

/// Validates all input and prints what was found
pub fn info(opt: JobOpt) -> anyhow::Result<()>
{
    let job = opt.load()?;
    let model = load_model(&job)?;
    let catalog = &model.catalog;
    let operators = &model.operators;

    println!("countries: {}", catalog.countries().len());
    println!("items: {}", catalog.items().len());
    println!("processes: {}", catalog.processes().len());
    println!("composite keys: {}", catalog.country_item().len());
    let receiving = job.region_exclusion.receiving_regions(catalog);
    println!("regions: {} receiving: {}", catalog.region_labels().len(), receiving.iter().join(", "));
    for (name, nnz) in operators.nnz_summary(){
        println!("nnz {name}: {nnz}");
    }

    let flags = operators.producer_flag();
    let (producers, others): (Vec<_>, Vec<_>) = (0..catalog.countries().len())
        .partition(|&c| operators.is_producer(&flags, c));
    println!("producer countries: {}", producers.len());
    println!(
        "countries without production (never simulated): {}",
        others.iter()
            .map(|&c| format!("{} ({})", catalog.countries()[c], catalog.region_of(c)))
            .join(", ")
    );
    Ok(())
}

pub fn default_config(opt: DefaultConfigOpt) -> anyhow::Result<()>
{
    write_default_json::<SimulationJob, _>(&opt.out)?;
    println!("Created {}", opt.out);
    Ok(())
}
