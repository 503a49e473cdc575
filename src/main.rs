#![no_main]
#![no_std]

use log::{info, LevelFilter};
use stm32f4xx_hal::{
  delay::Delay,
  gpio::gpioa,
  gpio::gpiob,
  gpio::AlternateOD,
  gpio::Edge,
  gpio::ExtiPin,
  gpio::Input,
  gpio::PullUp,
  gpio::AF4,
  i2c::I2c,
  prelude::*,
  pwm,
  pwm::PwmChannels,
  pwm::C2,
  stm32,
  stm32::TIM4,
};

use nfc_bridge::constants::BOOT_DELAY_MS;
use nfc_bridge::session::SessionFlags;

#[cfg(feature = "accel-stream")]
use cortex_m::asm;
#[cfg(feature = "accel-stream")]
use nfc_bridge::{adxl343::Adxl343, sampler::Sampler};
#[cfg(not(feature = "accel-stream"))]
use nfc_bridge::{
  analog::PwmOutput,
  ndef::{ntag::NtagMemory, t2t::Type2Tag},
  session::Session,
};

use panic_semihosting as _;

mod util;

const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

type I2cBus = I2c<stm32::I2C1, (gpiob::PB8<AlternateOD<AF4>>, gpiob::PB9<AlternateOD<AF4>>)>;
type Led = PwmChannels<TIM4, C2>;

#[cfg(not(feature = "accel-stream"))]
type Runner = Session<Type2Tag<NtagMemory<I2cBus>>, PwmOutput<Led>>;
#[cfg(feature = "accel-stream")]
type Runner = Option<Sampler<I2cBus>>;

static FLAGS: SessionFlags = SessionFlags::at_boot();

#[cfg(not(feature = "accel-stream"))]
fn start(bus: I2cBus, led: Led) -> Runner {
  info!("mode: nfc session");
  Session::new(Type2Tag::new(NtagMemory::new(bus)), PwmOutput::new(led))
}

#[cfg(feature = "accel-stream")]
fn start(bus: I2cBus, _led: Led) -> Runner {
  info!("mode: accel stream");
  match Sampler::start(Adxl343::new(bus)) {
    Ok(sampler) => Some(sampler),
    Err(e) => {
      log::error!("accel: {}", e);
      None
    }
  }
}

#[cfg(not(feature = "accel-stream"))]
fn run(runner: &mut Runner, delay: &mut Delay) -> ! {
  runner.run(&FLAGS, delay)
}

#[cfg(feature = "accel-stream")]
fn run(runner: &mut Runner, delay: &mut Delay) -> ! {
  match runner {
    Some(sampler) => sampler.run(delay),
    None => loop {
      asm::wfi();
    },
  }
}

#[rtic::app(device = stm32f4xx_hal::stm32, peripherals = true)]
const APP: () = {
  struct Resources {
    button: gpioa::PA0<Input<PullUp>>,
    field_detect: gpioa::PA1<Input<PullUp>>,
    message_ready: gpioa::PA2<Input<PullUp>>,
    runner: Runner,
    delay: Delay,
  }

  #[init]
  fn init(cx: init::Context) -> init::LateResources {
    util::init_logging(LOG_LEVEL);
    info!("init");

    // device specific peripherals
    let device: stm32::Peripherals = cx.device;
    let mut syscfg = device.SYSCFG;
    let mut exti = device.EXTI;

    let gpioa = device.GPIOA.split();
    let gpiob = device.GPIOB.split();
    let gpiod = device.GPIOD.split();

    let rcc = device.RCC.constrain();
    let clocks = rcc.cfgr.sysclk(168.mhz()).freeze();

    let mut delay = Delay::new(cx.core.SYST, clocks);
    // give the tag and the sensor time to come out of reset
    delay.delay_ms(BOOT_DELAY_MS);

    // user button
    let mut button = gpioa.pa0.into_pull_up_input();
    button.make_interrupt_source(&mut syscfg);
    button.trigger_on_edge(&mut exti, Edge::RISING);
    button.enable_interrupt(&mut exti);

    // NTAG field detect, low while a reader field is present
    let mut field_detect = gpioa.pa1.into_pull_up_input();
    field_detect.make_interrupt_source(&mut syscfg);
    field_detect.trigger_on_edge(&mut exti, Edge::RISING_FALLING);
    field_detect.enable_interrupt(&mut exti);

    // NTAG pass-through line, pulsed once the reader has written a message
    let mut message_ready = gpioa.pa2.into_pull_up_input();
    message_ready.make_interrupt_source(&mut syscfg);
    message_ready.trigger_on_edge(&mut exti, Edge::RISING);
    message_ready.enable_interrupt(&mut exti);

    // shared I2C bus for the tag and the accelerometer
    let scl = gpiob.pb8.into_alternate_af4_open_drain();
    let sda = gpiob.pb9.into_alternate_af4_open_drain();
    let bus = I2c::i2c1(device.I2C1, (scl, sda), 400.khz(), clocks);

    // analog output rendered on the orange LED
    let led_pin = gpiod.pd13.into_alternate_af2();
    let led = pwm::tim4(device.TIM4, led_pin, clocks, 20u32.khz());

    let runner = start(bus, led);

    init::LateResources {
      button,
      field_detect,
      message_ready,
      runner,
      delay,
    }
  }

  #[task(binds = EXTI0, resources = [button])]
  fn exti0(cx: exti0::Context) {
    cx.resources.button.clear_interrupt_pending_bit();
    FLAGS.on_button();
  }

  #[task(binds = EXTI1, resources = [field_detect])]
  fn exti1(cx: exti1::Context) {
    let field_detect = cx.resources.field_detect;
    field_detect.clear_interrupt_pending_bit();
    FLAGS.on_field_status(field_detect.is_low().unwrap_or(false));
  }

  #[task(binds = EXTI2, resources = [message_ready])]
  fn exti2(cx: exti2::Context) {
    cx.resources.message_ready.clear_interrupt_pending_bit();
    FLAGS.on_message_available();
  }

  #[idle(resources = [runner, delay])]
  fn idle(cx: idle::Context) -> ! {
    run(cx.resources.runner, cx.resources.delay)
  }
};
