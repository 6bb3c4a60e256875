// Mon Oct 19 2026 - Alex

use super::args::{Args, Command, DemoArgs, MapsArgs, ProbeArgs};
use crate::config::Config;
use crate::introspect::{FieldReport, Introspector, MethodRecord, ObjectVerdict};
use crate::memory::{self, Address, FaultGuardedProber, MappingSizer, MemoryProbe, ProbeOutcome, WORD_SIZE};
use crate::runtime::{AllocationSizer, ClassBuilder, ClassRef, ClassRegistry, InstanceHeap, MethodScope, TypeTag};
use crate::utils::pages::ScratchPages;
use crate::utils::{self, LoggingUtils};
use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;

pub struct CommandHandler {
    json: bool,
}

#[derive(Serialize)]
struct ProbeReport {
    address: Address,
    len: usize,
    outcome: ProbeOutcome,
}

#[derive(Serialize)]
struct SampleReport {
    label: String,
    verdict: ObjectVerdict,
    fields: Option<FieldReport>,
    instance_methods: Vec<MethodRecord>,
    class_methods: Vec<MethodRecord>,
}

#[derive(Serialize)]
struct DemoReport {
    samples: Vec<SampleReport>,
    extra: Vec<ObjectVerdict>,
    guard: memory::GuardStats,
}

/// Sample classes and instances the demo introspects. Owns every allocation it hands out.
struct DemoWorld {
    registry: Arc<ClassRegistry>,
    heap: Arc<InstanceHeap>,
    /// Keeps the straddling sample mapped.
    _pages: ScratchPages,
    samples: Vec<(String, Address)>,
}

impl CommandHandler {
    pub fn new() -> Self {
        Self { json: false }
    }

    pub fn execute(mut self, args: Args) -> anyhow::Result<()> {
        self.setup_logging(&args)?;
        self.json = args.json;

        let config = match &args.config {
            Some(path) => Config::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => Config::default(),
        };

        match args.command {
            Command::Probe(probe_args) => self.handle_probe(probe_args, &config),
            Command::Maps(maps_args) => self.handle_maps(maps_args),
            Command::Demo(demo_args) => self.handle_demo(demo_args, config),
        }
    }

    fn setup_logging(&self, args: &Args) -> anyhow::Result<()> {
        let level = Self::log_level(args)?;
        if args.no_color {
            colored::control::set_override(false);
        }
        LoggingUtils::init(level, !args.no_color);
        Ok(())
    }

    /// `-v` flags override `--log-level`.
    fn log_level(args: &Args) -> anyhow::Result<log::LevelFilter> {
        if args.verbose > 0 {
            return Ok(LoggingUtils::level_from_verbosity(args.verbose as usize));
        }
        LoggingUtils::level_from_str(&args.log_level)
            .ok_or_else(|| anyhow::anyhow!("unknown log level '{}'", args.log_level))
    }

    fn handle_probe(&self, args: ProbeArgs, config: &Config) -> anyhow::Result<()> {
        let address: Address = args
            .address
            .parse()
            .with_context(|| format!("parsing address '{}'", args.address))?;
        let prober = FaultGuardedProber::new().with_max_len(config.max_probe_len);
        let outcome = prober.probe(address, args.len)?;

        if self.json {
            return self.print_json(&ProbeReport {
                address,
                len: args.len,
                outcome,
            });
        }

        match &outcome {
            ProbeOutcome::Readable(bytes) => {
                println!("{} {} readable, {}", "[+]".green(), address, utils::pluralize(bytes.len(), "byte", "bytes"));
                if !bytes.is_empty() {
                    println!("{}", utils::hex_dump(address, bytes));
                }
            }
            ProbeOutcome::Unreadable(kind) => {
                println!("{} {} unreadable: {}", "[!]".yellow(), address, kind);
            }
        }
        Ok(())
    }

    fn handle_maps(&self, args: MapsArgs) -> anyhow::Result<()> {
        let regions: Vec<_> = memory::self_regions()?
            .into_iter()
            .filter(|region| args.all || region.is_readable())
            .collect();

        if self.json {
            return self.print_json(&regions);
        }

        let total: usize = regions.iter().map(|region| region.size()).sum();
        println!(
            "{} {} ({})",
            "[*]".blue(),
            utils::pluralize(regions.len(), "mapping", "mappings"),
            utils::format_bytes(total as u64)
        );
        for region in &regions {
            println!("  {}", region);
        }
        Ok(())
    }

    fn handle_demo(&self, args: DemoArgs, config: Config) -> anyhow::Result<()> {
        let extra = args
            .addresses
            .iter()
            .map(|text| {
                text.parse::<Address>()
                    .with_context(|| format!("parsing address '{}'", text))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let world = DemoWorld::build()?;
        let sizer: Arc<dyn AllocationSizer> = if args.maps_sizer {
            Arc::new(MappingSizer::new())
        } else {
            world.heap.clone()
        };
        let introspector = Introspector::builder(world.registry.clone())
            .with_config(config)
            .with_allocation_sizer(sizer)
            .build()?;

        let mut samples = Vec::new();
        for (label, address) in &world.samples {
            samples.push(Self::inspect(&introspector, label, *address)?);
        }
        let extra = introspector.classify_batch(&extra)?;

        let report = DemoReport {
            samples,
            extra,
            guard: memory::guard_stats(),
        };
        if self.json {
            return self.print_json(&report);
        }
        self.print_demo(&report);
        Ok(())
    }

    fn inspect(introspector: &Introspector, label: &str, address: Address) -> anyhow::Result<SampleReport> {
        let verdict = introspector.classify(address)?;
        let (fields, instance_methods, class_methods) = match verdict.class {
            Some(class) if verdict.allocation_large_enough != Some(false) => (
                Some(introspector.list_instance_fields(address)?),
                introspector.list_methods(class, MethodScope::Instance)?,
                introspector.list_class_methods(class)?,
            ),
            _ => (None, Vec::new(), Vec::new()),
        };
        Ok(SampleReport {
            label: label.to_string(),
            verdict,
            fields,
            instance_methods,
            class_methods,
        })
    }

    fn print_demo(&self, report: &DemoReport) {
        for sample in &report.samples {
            println!("{} {}", "==>".cyan().bold(), sample.label.bold());
            self.print_verdict(&sample.verdict);
            if let Some(fields) = &sample.fields {
                for record in &fields.fields {
                    let line = format!("    {}", record);
                    if record.value.is_readable() {
                        println!("{}", line);
                    } else {
                        println!("{}", line.red());
                    }
                }
                if let Some(failure) = &fields.ancestor_failure {
                    println!("    {} stopped at {}: {}", "partial".yellow(), failure.class, failure.reason);
                }
            }
            let methods: Vec<String> = sample
                .class_methods
                .iter()
                .chain(&sample.instance_methods)
                .map(|method| method.to_string())
                .collect();
            if !methods.is_empty() {
                println!("    methods: {}", methods.join(" "));
            }
        }

        if !report.extra.is_empty() {
            println!("{} {}", "==>".cyan().bold(), "extra addresses".bold());
            for verdict in &report.extra {
                self.print_verdict(verdict);
            }
        }

        let stats = &report.guard;
        println!(
            "{} {} probe windows, {} faults recovered, {} forwarded",
            "[*]".blue(),
            stats.windows,
            stats.faults,
            stats.forwarded
        );
    }

    fn print_verdict(&self, verdict: &ObjectVerdict) {
        let marker = if verdict.is_likely_object {
            "[+]".green()
        } else {
            "[-]".dimmed()
        };
        println!("  {} {}", marker, verdict);
    }

    fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoWorld {
    fn build() -> anyhow::Result<Self> {
        let registry = Arc::new(ClassRegistry::new());
        registry.register(
            ClassBuilder::new("Root")
                .instance_method("init")
                .instance_method("description")
                .class_method("alloc")
                .class_method("new"),
        )?;
        let point = registry.register(
            ClassBuilder::new("Point")
                .superclass("Root")
                .ivar("x", TypeTag::parse("d"))
                .ivar("y", TypeTag::parse("d"))
                .ivar_sized("bounds", TypeTag::parse("{Rect=dddd}"), 24, 32)
                .instance_method("distanceTo:"),
        )?;
        let node = registry.register(
            ClassBuilder::new("Node")
                .superclass("Root")
                .ivar("value", TypeTag::parse("q"))
                .ivar("next", TypeTag::object_of("Node"))
                .ivar("label", TypeTag::parse("*"))
                .instance_method("append:")
                .class_method("nodeWithValue:"),
        )?;
        let straddler = registry.register(
            ClassBuilder::new("Straddler")
                .superclass("Root")
                .ivar("count", TypeTag::parse("q"))
                .ivar("owner", TypeTag::object())
                .ivar("flags", TypeTag::parse("I")),
        )?;
        let orphan = registry.register(
            ClassBuilder::new("Orphan")
                .superclass("Missing")
                .ivar("tag", TypeTag::parse("i")),
        )?;

        let heap = Arc::new(InstanceHeap::new());
        let origin = heap.allocate(registry.as_ref(), point)?;
        Self::set_field(&registry, &heap, point, origin, "x", &1.5f64.to_ne_bytes())?;
        Self::set_field(&registry, &heap, point, origin, "y", &(-2.0f64).to_ne_bytes())?;

        let tail = heap.allocate(registry.as_ref(), node)?;
        let head = heap.allocate(registry.as_ref(), node)?;
        Self::set_field(&registry, &heap, node, tail, "value", &2i64.to_ne_bytes())?;
        Self::set_field(&registry, &heap, node, head, "value", &1i64.to_ne_bytes())?;
        Self::set_field(&registry, &heap, node, head, "next", &tail.as_usize().to_ne_bytes())?;

        let undersized = heap.allocate_with_size(node, WORD_SIZE)?;
        let lost = heap.allocate(registry.as_ref(), orphan)?;

        // Header, count and owner end exactly at the page boundary; flags is on the no-access page.
        let pages = ScratchPages::new(2)?;
        let start = pages.page_size() - 3 * WORD_SIZE;
        pages.write_word(start, straddler.header_word());
        pages.write_word(start + WORD_SIZE, 3);
        pages.write_word(start + 2 * WORD_SIZE, head.as_usize());
        pages.protect_tail(1)?;
        let straddling = pages.base().wrapping_add(start);

        let plain = Box::leak(Box::new([0x5a5a_5a5a_usize; 4]));

        let samples = vec![
            ("point".to_string(), origin),
            ("linked list head".to_string(), head),
            ("undersized node".to_string(), undersized),
            ("object across a no-access page".to_string(), straddling),
            ("instance of a class with a missing superclass".to_string(), lost),
            ("plain data".to_string(), Address::from_ref(plain)),
            ("no-access page".to_string(), pages.page(1)),
            ("null".to_string(), Address::zero()),
        ];

        Ok(Self {
            registry,
            heap,
            _pages: pages,
            samples,
        })
    }

    fn set_field(
        registry: &ClassRegistry,
        heap: &InstanceHeap,
        class: ClassRef,
        object: Address,
        name: &str,
        bytes: &[u8],
    ) -> anyhow::Result<()> {
        let field = registry
            .field(class, name)
            .with_context(|| format!("no field '{}'", name))?;
        heap.write_bytes(object, field.offset(), bytes)?;
        Ok(())
    }
}
